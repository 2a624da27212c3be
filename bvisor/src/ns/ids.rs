//! Thread and thread-group identifiers, in both the supervisor's own PID
//! namespace (`Abs*`) and a guest-visible nested namespace (`Ns*`).

use std::fmt;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub i32);

        impl $name {
            pub fn get(self) -> i32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i32> for $name {
            fn from(v: i32) -> Self {
                $name(v)
            }
        }
    };
}

id_newtype!(AbsTid);
id_newtype!(AbsTgid);
id_newtype!(NsTid);
id_newtype!(NsTgid);

impl AbsTgid {
    /// Treat this thread-group id as a thread id for lookups keyed on `AbsTid`
    /// (the group leader's `tid == tgid`).
    pub fn as_tid(self) -> AbsTid {
        AbsTid(self.0)
    }
}

impl NsTgid {
    pub fn as_tid(self) -> NsTid {
        NsTid(self.0)
    }
}
