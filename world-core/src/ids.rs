//! Stable ids for cross-referencing entities kept in arenas, avoiding
//! cyclic references between player/mob state.

use std::fmt;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                $name(value)
            }
        }
    };
}

id_type!(SocketId);
id_type!(PlayerId);
id_type!(MobId);

/// An entity is either a player or a mob; many subsystems (AOI, tile
/// movement) are agnostic to which.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityId {
    Player(PlayerId),
    Mob(MobId),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Player(id) => write!(f, "player:{id}"),
            EntityId::Mob(id) => write!(f, "mob:{id}"),
        }
    }
}
