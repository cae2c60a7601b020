pub(crate) mod plugin_module;
