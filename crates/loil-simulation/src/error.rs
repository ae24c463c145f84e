use loil_core::{CharacterId, CoreError, LocationId, ObjectId, PlayerId};

/// Alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;

/// Errors raised while building or running a simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The world model rejected an operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// No lane exists for the location.
    #[error("location not found in simulation: {0}")]
    LocationNotFound(LocationId),

    /// No such character.
    #[error("character not found in simulation: {0}")]
    CharacterNotFound(CharacterId),

    /// No such object.
    #[error("object not found in simulation: {0}")]
    ObjectNotFound(ObjectId),

    /// The object's type is missing from the registry.
    #[error("object {object} has unknown type {type_id}")]
    UnknownObjectType {
        /// The object.
        object: ObjectId,
        /// Its unregistered type code.
        type_id: i32,
    },

    /// The interaction index is past the end of the object's list.
    #[error("object {object} has no interaction {index} ({available} available)")]
    InteractionOutOfRange {
        /// The object.
        object: ObjectId,
        /// Requested index.
        index: usize,
        /// Number of interactions the object type has.
        available: usize,
    },

    /// Another player already controls the character.
    #[error("character {character} is controlled by player {owner}")]
    CharacterTaken {
        /// The requested character.
        character: CharacterId,
        /// Its current controller.
        owner: PlayerId,
    },

    /// The player has not joined with a character.
    #[error("player {0} controls no character")]
    NoCharacter(PlayerId),
}
