pub mod engine;
pub mod states;

pub use engine::{JourneyEngine, JourneyError};
pub use states::{
    CollectedFields, Journey, JourneyField, JourneyReply, JourneyState, JourneyType, TurnInput,
};
