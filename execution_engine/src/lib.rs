pub use crate::execution_engine::{
    Error, ExecutionEngine, MockExecutionEngine, NullExecutionEngine,
};

mod execution_engine;
