//! Module orchestrator.
//!
//! The [`Firewall`] runs every enabled module against a request in
//! registration order and collects one [`Action`] per module. It never stops
//! early on a block; reconciling the actions is left to [`resolve`].

use crate::action::{Action, Verdict, resolve};
use crate::context::RequestContext;
use crate::error::{FirewallError, FirewallResult};
use crate::module::FirewallModule;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

struct ModuleSlot {
    module: Arc<dyn FirewallModule>,
    enabled: AtomicBool,
}

/// Ordered collection of inspection modules.
pub struct Firewall {
    modules: Vec<ModuleSlot>,
    enabled: AtomicBool,
}

impl Firewall {
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
            enabled: AtomicBool::new(true),
        }
    }

    /// Register a module. Names must be unique.
    pub fn use_module<M: FirewallModule + 'static>(&mut self, module: M) -> FirewallResult<&mut Self> {
        self.use_arc(Arc::new(module))
    }

    /// Register an already shared module.
    pub fn use_arc(&mut self, module: Arc<dyn FirewallModule>) -> FirewallResult<&mut Self> {
        if self.modules.iter().any(|slot| slot.module.name() == module.name()) {
            return Err(FirewallError::DuplicateModule(module.name().to_string()));
        }

        debug!(
            module = module.name(),
            enabled = module.enabled_by_default(),
            "Registering firewall module"
        );
        self.modules.push(ModuleSlot {
            enabled: AtomicBool::new(module.enabled_by_default()),
            module,
        });
        Ok(self)
    }

    /// Builder-style registration.
    pub fn with_module<M: FirewallModule + 'static>(mut self, module: M) -> FirewallResult<Self> {
        self.use_module(module)?;
        Ok(self)
    }

    /// Enable or disable a module by name. Takes effect for subsequent
    /// requests. Returns false if no module has that name.
    pub fn set_module_enabled(&self, name: &str, enabled: bool) -> bool {
        match self.modules.iter().find(|slot| slot.module.name() == name) {
            Some(slot) => {
                slot.enabled.store(enabled, Ordering::Release);
                debug!(module = name, enabled, "Module toggled");
                true
            }
            None => false,
        }
    }

    /// Whether the named module is enabled, or `None` if unknown.
    pub fn is_module_enabled(&self, name: &str) -> Option<bool> {
        self.modules
            .iter()
            .find(|slot| slot.module.name() == name)
            .map(|slot| slot.enabled.load(Ordering::Acquire))
    }

    /// Registered module names in registration order.
    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|slot| slot.module.name()).collect()
    }

    /// Enable or disable the whole firewall.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Run every enabled module once and collect their actions in order.
    pub async fn handle(&self, ctx: &mut RequestContext) -> Vec<Action> {
        if !self.is_enabled() {
            trace!(path = %ctx.path, "Firewall disabled, skipping inspection");
            return Vec::new();
        }

        let mut actions = Vec::with_capacity(self.modules.len());
        for slot in &self.modules {
            if !slot.enabled.load(Ordering::Acquire) {
                continue;
            }
            trace!(module = slot.module.name(), "Running module");
            actions.push(slot.module.analyze(ctx).await);
        }

        debug!(
            path = %ctx.path,
            actions = actions.len(),
            "Firewall inspection complete"
        );
        actions
    }

    /// Run all modules and reconcile their actions.
    pub async fn inspect(&self, ctx: &mut RequestContext) -> Verdict {
        resolve(self.handle(ctx).await)
    }
}

impl Default for Firewall {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Firewall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Firewall")
            .field("modules", &self.module_names())
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
