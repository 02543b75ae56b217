//! Machine-configuration aggregate entities.

pub mod model;
pub mod parameter;

pub use model::{
    AbstractConfig, ConfigType, ConfigUpdate, ContentSection, CreateConfig, ParentConfig, SharedAs,
};
pub use parameter::{ContentMap, NewParameter, Parameter};
