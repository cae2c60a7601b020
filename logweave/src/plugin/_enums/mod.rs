pub(crate) mod kind;
pub(crate) mod result;
pub(crate) mod state;
