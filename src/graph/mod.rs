pub(crate) mod def;
pub(crate) mod model;
pub(crate) mod order;
pub(crate) mod ports;
pub(crate) mod settings;
pub(crate) mod shape;
