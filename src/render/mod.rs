pub(crate) mod arena;
pub(crate) mod cpu;
pub(crate) mod filters;
pub(crate) mod fluid;
pub(crate) mod generate;
pub(crate) mod jfa;
pub(crate) mod kernel;
pub(crate) mod profiling;
pub(crate) mod resources;
