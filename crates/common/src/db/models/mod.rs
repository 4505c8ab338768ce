//! SeaORM entity models
//!
//! Database entities for DeepScout

mod research_request;

pub use research_request::{
    Entity as ResearchRequestEntity,
    Model as ResearchRequest,
    ActiveModel as ResearchRequestActiveModel,
    Column as ResearchRequestColumn,
    RequestStatus,
};
