use std::rc::Rc;

use mdinspect_engine::{
    register_builtin_handlers, AccessPolicy, ChainInterpreter, HandlerRegistry, MethodIndexCache,
};
use mdinspect_world::{register_world_handlers, Server};
use tracing::{debug, info};

/// The debugging tool as loaded into a server.
///
/// Converters are registered on [`enable`](Self::enable) and dropped, along
/// with every cached method index, on [`disable`](Self::disable).
pub struct DebugPlugin {
    server: Rc<Server>,
    registry: HandlerRegistry,
    methods: MethodIndexCache,
    access: AccessPolicy,
    enabled: bool,
}

impl DebugPlugin {
    pub fn new(server: Rc<Server>, access: AccessPolicy) -> Self {
        Self {
            server,
            registry: HandlerRegistry::new(),
            methods: MethodIndexCache::new(),
            access,
            enabled: false,
        }
    }

    pub fn enable(&mut self) {
        if self.enabled {
            return;
        }
        register_builtin_handlers(&mut self.registry);
        let world = register_world_handlers(&mut self.registry, &self.server);
        self.enabled = true;
        info!(
            inputs = self.registry.input_count(),
            outputs = self.registry.output_count(),
            world,
            "debug plugin enabled"
        );
    }

    pub fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        let cached = self.methods.len();
        self.methods.clear();
        self.registry = HandlerRegistry::new();
        self.enabled = false;
        debug!(cached, "method indices dropped");
        info!("debug plugin disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn server(&self) -> &Rc<Server> {
        &self.server
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn methods(&self) -> &MethodIndexCache {
        &self.methods
    }

    pub fn access(&self) -> &AccessPolicy {
        &self.access
    }

    pub fn set_access(&mut self, access: AccessPolicy) {
        self.access = access;
    }

    pub fn interpreter(&self) -> ChainInterpreter<'_> {
        ChainInterpreter::new(&self.registry, &self.methods, &self.access)
    }
}

impl Drop for DebugPlugin {
    fn drop(&mut self) {
        self.disable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdinspect_core::Object;
    use mdinspect_world::PLAYER;

    #[test]
    fn enable_registers_and_disable_clears() {
        let server = Server::sample().unwrap();
        let mut plugin = DebugPlugin::new(server.clone(), AccessPolicy::default());
        assert!(!plugin.registry().can_instantiate(&PLAYER));

        plugin.enable();
        plugin.enable();
        assert!(plugin.is_enabled());
        assert!(plugin.registry().can_instantiate(&PLAYER));
        let outputs = plugin.registry().output_count();

        let result = plugin
            .interpreter()
            .run(&["getName()"], Some(server.clone() as Object), None);
        assert!(result.is_success());
        assert_eq!(plugin.methods().len(), 1);

        plugin.disable();
        assert!(!plugin.registry().can_instantiate(&PLAYER));
        assert!(plugin.methods().is_empty());

        plugin.enable();
        assert_eq!(plugin.registry().output_count(), outputs);
    }
}
