//! Serializable summary of a compile pass.

use crate::compiler::{CompiledApplication, ResolvedModule};
use crate::di::Token;
use crate::lifecycle::HookKind;
use crate::middleware::PathMiddleware;
use crate::module::ModuleId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use strum::IntoEnumIterator;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct GraphReport {
    pub pass_id: Uuid,
    pub compiled_at: DateTime<Utc>,
    pub root: ModuleId,
    pub modules: Vec<ModuleReport>,
    pub hooks: BTreeMap<String, Vec<ModuleId>>,
    pub middlewares: Vec<MiddlewareReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleReport {
    pub id: ModuleId,
    pub global: bool,
    pub imports: Vec<ModuleId>,
    pub providers: Vec<Token>,
    pub middleware: Vec<Token>,
    pub controllers: Vec<Token>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MiddlewareReport {
    pub path: String,
    pub handlers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub excluded: Vec<String>,
}

impl GraphReport {
    pub fn from_application(app: &CompiledApplication) -> Self {
        let hooks = HookKind::iter()
            .map(|kind| (kind.to_string(), app.hooks().order(kind)))
            .collect();

        Self {
            pass_id: app.pass_id(),
            compiled_at: app.compiled_at(),
            root: app.root().clone(),
            modules: app.modules().iter().map(ModuleReport::from).collect(),
            hooks,
            middlewares: app.chain().iter().map(MiddlewareReport::from).collect(),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl From<&ResolvedModule> for ModuleReport {
    fn from(module: &ResolvedModule) -> Self {
        let controllers = module
            .descriptor()
            .controllers()
            .iter()
            .map(|c| c.key().clone())
            .filter(|key| module.controller_instances().contains_key(key))
            .collect();

        Self {
            id: module.id().clone(),
            global: module.is_global(),
            imports: module.imports().to_vec(),
            providers: module.ordered_keys(module.provider_instances()),
            middleware: module.ordered_keys(module.middleware_instances()),
            controllers,
        }
    }
}

impl From<&PathMiddleware> for MiddlewareReport {
    fn from(group: &PathMiddleware) -> Self {
        Self {
            path: group.path().to_string(),
            handlers: group.handler_names(),
            excluded: group.excluded().to_vec(),
        }
    }
}
