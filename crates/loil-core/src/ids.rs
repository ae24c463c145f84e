use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! int_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i32);

        impl $name {
            /// The raw integer value.
            pub fn get(self) -> i32 {
                self.0
            }

            /// Whether this is the zero ID, which the file formats use for "none".
            pub fn is_none(self) -> bool {
                self.0 == 0
            }
        }

        impl From<i32> for $name {
            fn from(value: i32) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

int_id!(
    /// Identifier of a location (one lane).
    LocationId
);
int_id!(
    /// Identifier of a character.
    CharacterId
);
int_id!(
    /// Identifier of a creature.
    CreatureId
);
int_id!(
    /// Identifier of a placed world object.
    ObjectId
);
int_id!(
    /// Identifier of a remote player. `0` marks an NPC-controlled character.
    PlayerId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn ids_serialize_as_plain_integers() {
        let json = serde_json::to_string(&LocationId(7)).unwrap();
        assert_eq!(json, "7");
        let back: LocationId = serde_json::from_str("7").unwrap();
        assert_eq!(back, LocationId(7));
    }

    #[test]
    fn ids_work_as_json_map_keys() {
        let mut map = BTreeMap::new();
        map.insert(ObjectId(12), "tree");
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"12":"tree"}"#);
        let back: BTreeMap<ObjectId, String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[&ObjectId(12)], "tree");
    }

    #[test]
    fn zero_means_none() {
        assert!(PlayerId(0).is_none());
        assert!(!PlayerId(3).is_none());
    }
}
