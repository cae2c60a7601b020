use crate::event::LogEntry;
use crate::plugin::{NativeModule, PluginConfig, PluginDescriptor, PluginModule, PluginResult};
use enum_dispatch::enum_dispatch;

/// Where a registered plugin's code lives.
#[enum_dispatch(PluginModule)]
pub enum PluginBackend {
    Native(NativeModule),
    Builtin(Box<dyn PluginModule>),
}

impl PluginBackend {
    pub fn builtin<M: PluginModule + 'static>(module: M) -> Self {
        PluginBackend::Builtin(Box::new(module))
    }

    pub fn is_native(&self) -> bool {
        matches!(self, PluginBackend::Native(_))
    }
}

impl PluginModule for PluginBackend {
    fn descriptor(&self) -> Option<PluginDescriptor> {
        match self {
            PluginBackend::Native(m) => m.descriptor(),
            PluginBackend::Builtin(m) => m.descriptor(),
        }
    }

    fn init(&mut self, config: &PluginConfig) -> i32 {
        match self {
            PluginBackend::Native(m) => m.init(config),
            PluginBackend::Builtin(m) => m.init(config),
        }
    }

    fn process(&mut self, entry: &LogEntry) -> PluginResult {
        match self {
            PluginBackend::Native(m) => m.process(entry),
            PluginBackend::Builtin(m) => m.process(entry),
        }
    }

    fn shutdown(&mut self) {
        match self {
            PluginBackend::Native(m) => m.shutdown(),
            PluginBackend::Builtin(m) => m.shutdown(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{MockPluginModule, PluginKind};

    #[test]
    fn test_builtin_forwards_calls() {
        let mut mock = MockPluginModule::new();
        mock.expect_descriptor()
            .returning(|| Some(PluginDescriptor::new("m", PluginKind::Sink)));
        mock.expect_init().times(1).returning(|_| 0);
        mock.expect_process().times(1).returning(|_| PluginResult::Retry);
        mock.expect_shutdown().times(1).return_const(());

        let mut backend = PluginBackend::builtin(mock);
        assert!(!backend.is_native());
        assert_eq!(backend.descriptor().map(|d| d.kind), Some(PluginKind::Sink));
        assert_eq!(backend.init(&PluginConfig::empty()), 0);
        assert_eq!(
            backend.process(&LogEntry::info(Some("test"), "hello")),
            PluginResult::Retry
        );
        backend.shutdown();
    }

    #[test]
    fn test_from_boxed_module() {
        let boxed: Box<dyn PluginModule> = Box::new(MockPluginModule::new());
        let backend: PluginBackend = boxed.into();
        assert!(matches!(backend, PluginBackend::Builtin(_)));
    }
}
