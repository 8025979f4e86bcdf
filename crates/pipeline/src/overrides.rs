use crate::service::Payload;
use media_model::MediaQuery;
use std::collections::HashMap;

pub type PayloadHook = Box<dyn Fn(&mut Payload) + Send + Sync>;
pub type QueryHook = Box<dyn Fn(&mut MediaQuery) + Send + Sync>;

/// Optional behavior overrides for one external service.
#[derive(Default)]
pub struct ServiceHooks {
    /// Rewrites the create payload before submission.
    pub create_payload: Option<PayloadHook>,
    /// Rewrites the outgoing page query before a fetch.
    pub page_query: Option<QueryHook>,
}

impl ServiceHooks {
    pub fn with_create_payload(mut self, hook: impl Fn(&mut Payload) + Send + Sync + 'static) -> Self {
        self.create_payload = Some(Box::new(hook));
        self
    }

    pub fn with_page_query(mut self, hook: impl Fn(&mut MediaQuery) + Send + Sync + 'static) -> Self {
        self.page_query = Some(Box::new(hook));
        self
    }
}

/// Capability lookup for per-service behavior.
///
/// A single rule everywhere: apply the override when one is registered for
/// the service identifier, otherwise take the default path. Requests with no
/// service identifier always take the default path.
#[derive(Default)]
pub struct OverrideTable {
    hooks: HashMap<String, ServiceHooks>,
}

impl OverrideTable {
    pub fn register(&mut self, service: impl Into<String>, hooks: ServiceHooks) {
        self.hooks.insert(service.into(), hooks);
    }

    pub fn apply_create(&self, service: Option<&str>, payload: &mut Payload) {
        if let Some(hook) = self.lookup(service).and_then(|h| h.create_payload.as_ref()) {
            hook(payload);
        }
    }

    pub fn apply_page_query(&self, service: Option<&str>, query: &mut MediaQuery) {
        if let Some(hook) = self.lookup(service).and_then(|h| h.page_query.as_ref()) {
            hook(query);
        }
    }

    fn lookup(&self, service: Option<&str>) -> Option<&ServiceHooks> {
        service.and_then(|s| self.hooks.get(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn hooks_apply_only_to_their_service() {
        let mut table = OverrideTable::default();
        table.register(
            "external",
            ServiceHooks::default().with_create_payload(|payload| {
                payload.insert("via".to_string(), json!("hook"));
            }),
        );

        let mut payload = Payload::new();
        table.apply_create(Some("external"), &mut payload);
        assert_eq!(payload.get("via"), Some(&json!("hook")));

        let mut untouched = Payload::new();
        table.apply_create(Some("other"), &mut untouched);
        table.apply_create(None, &mut untouched);
        assert_eq!(untouched.is_empty(), true);
    }

    #[test]
    fn page_query_hook_rewrites_the_outgoing_query() {
        let mut table = OverrideTable::default();
        table.register(
            "external",
            ServiceHooks::default().with_page_query(|query| {
                query.set("path", "recent");
            }),
        );

        let mut query = MediaQuery::new();
        table.apply_page_query(Some("external"), &mut query);
        assert_eq!(query.str_param("path"), Some("recent"));
    }
}
