//! Fluent construction of agent cards and servers.

use crate::types::*;
use std::collections::HashMap;

/// Assembles an [`AgentCard`] field by field.
///
/// ```
/// use a2a_runtime::builders::AgentCardBuilder;
///
/// let card = AgentCardBuilder::new("Echo Agent", "Echoes messages back", "1.0.0")
///     .with_jsonrpc_interface("http://localhost:3000/a2a")
///     .with_skill("echo", "Echo", "Repeats what it hears", vec!["chat".to_string()])
///     .with_streaming(true)
///     .build();
/// assert_eq!(card.preferred_transport, "JSONRPC");
/// ```
#[derive(Debug, Clone)]
pub struct AgentCardBuilder {
    name: String,
    description: String,
    version: String,
    url: String,
    preferred_transport: String,
    additional_interfaces: Option<Vec<AgentInterface>>,
    provider: Option<AgentProvider>,
    documentation_url: Option<String>,
    capabilities: AgentCapabilities,
    security_schemes: Option<HashMap<String, SecurityScheme>>,
    security: Option<Vec<SecurityRequirement>>,
    default_input_modes: Vec<String>,
    default_output_modes: Vec<String>,
    skills: Vec<AgentSkill>,
    icon_url: Option<String>,
}

impl AgentCardBuilder {
    /// Start a card from its required identity fields.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        AgentCardBuilder {
            name: name.into(),
            description: description.into(),
            version: version.into(),
            url: String::new(),
            preferred_transport: "JSONRPC".to_string(),
            additional_interfaces: None,
            provider: None,
            documentation_url: None,
            capabilities: AgentCapabilities::default(),
            security_schemes: None,
            security: None,
            default_input_modes: vec!["text/plain".to_string()],
            default_output_modes: vec!["text/plain".to_string()],
            skills: Vec::new(),
            icon_url: None,
        }
    }

    /// Declare the JSON-RPC endpoint. The first interface becomes the
    /// card's primary `url`.
    pub fn with_jsonrpc_interface(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        if self.url.is_empty() {
            self.url = url.clone();
            self.preferred_transport = "JSONRPC".to_string();
        }
        self.additional_interfaces
            .get_or_insert_with(Vec::new)
            .push(AgentInterface {
                url,
                transport: "JSONRPC".to_string(),
            });
        self
    }

    /// Declare an extra endpoint on an arbitrary transport.
    pub fn with_interface(mut self, interface: AgentInterface) -> Self {
        if self.url.is_empty() {
            self.url = interface.url.clone();
            self.preferred_transport = interface.transport.clone();
        }
        self.additional_interfaces
            .get_or_insert_with(Vec::new)
            .push(interface);
        self
    }

    /// Name the operating organization.
    pub fn with_provider(mut self, organization: impl Into<String>, url: impl Into<String>) -> Self {
        self.provider = Some(AgentProvider {
            organization: organization.into(),
            url: url.into(),
        });
        self
    }

    /// Link human documentation.
    pub fn with_documentation_url(mut self, url: impl Into<String>) -> Self {
        self.documentation_url = Some(url.into());
        self
    }

    /// Declare streaming support.
    pub fn with_streaming(mut self, enabled: bool) -> Self {
        self.capabilities.streaming = Some(enabled);
        self
    }

    /// Declare push notification support.
    pub fn with_push_notifications(mut self, enabled: bool) -> Self {
        self.capabilities.push_notifications = Some(enabled);
        self
    }

    /// Declare a protocol extension.
    pub fn with_extension(
        mut self,
        uri: impl Into<String>,
        description: Option<String>,
        required: bool,
    ) -> Self {
        self.capabilities
            .extensions
            .get_or_insert_with(Vec::new)
            .push(AgentExtension {
                uri: uri.into(),
                description,
                required: Some(required),
                params: None,
            });
        self
    }

    /// Add a skill.
    pub fn with_skill(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        tags: Vec<String>,
    ) -> Self {
        self.skills.push(AgentSkill {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            tags,
            examples: None,
            input_modes: None,
            output_modes: None,
            security: None,
        });
        self
    }

    /// Add a skill with example prompts.
    pub fn with_skill_examples(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        tags: Vec<String>,
        examples: Vec<String>,
    ) -> Self {
        self.skills.push(AgentSkill {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            tags,
            examples: Some(examples),
            input_modes: None,
            output_modes: None,
            security: None,
        });
        self
    }

    /// Replace the default input MIME types.
    pub fn with_input_modes(mut self, modes: Vec<String>) -> Self {
        self.default_input_modes = modes;
        self
    }

    /// Replace the default output MIME types.
    pub fn with_output_modes(mut self, modes: Vec<String>) -> Self {
        self.default_output_modes = modes;
        self
    }

    /// Declare named security schemes and the requirements referencing them.
    pub fn with_security(
        mut self,
        schemes: HashMap<String, SecurityScheme>,
        requirements: Vec<SecurityRequirement>,
    ) -> Self {
        self.security_schemes = Some(schemes);
        self.security = Some(requirements);
        self
    }

    /// Link an icon.
    pub fn with_icon_url(mut self, url: impl Into<String>) -> Self {
        self.icon_url = Some(url.into());
        self
    }

    /// Finish the card.
    pub fn build(self) -> AgentCard {
        AgentCard {
            name: self.name,
            description: self.description,
            version: self.version,
            protocol_version: "0.3.0".to_string(),
            url: self.url,
            preferred_transport: self.preferred_transport,
            additional_interfaces: self.additional_interfaces,
            provider: self.provider,
            documentation_url: self.documentation_url,
            capabilities: self.capabilities,
            security_schemes: self.security_schemes,
            security: self.security,
            default_input_modes: self.default_input_modes,
            default_output_modes: self.default_output_modes,
            skills: self.skills,
            supports_authenticated_extended_card: None,
            signatures: None,
            icon_url: self.icon_url,
        }
    }
}

/// Wires an executor, stores, and an agent card into a servable router.
///
/// ```rust,ignore
/// let app = ServerBuilder::new(executor)
///     .with_task_store(Arc::new(InMemoryTaskStore::new()))
///     .with_agent_card(|card| card.with_jsonrpc_interface("http://localhost:3000/a2a"))
///     .with_cors(true)
///     .build();
/// axum::serve(listener, app).await?;
/// ```
#[cfg(feature = "transport-http")]
pub struct ServerBuilder {
    executor: std::sync::Arc<dyn crate::server::AgentExecutor>,
    task_store: Option<std::sync::Arc<dyn crate::server::TaskStore>>,
    queue_manager: Option<std::sync::Arc<dyn crate::server::QueueManager>>,
    push_notifications: Option<(
        std::sync::Arc<dyn crate::server::PushNotificationConfigStore>,
        std::sync::Arc<dyn crate::server::PushNotificationSender>,
    )>,
    agent_card: Option<AgentCard>,
    cors_enabled: bool,
}

#[cfg(feature = "transport-http")]
impl ServerBuilder {
    /// Start from the one mandatory collaborator.
    pub fn new(executor: std::sync::Arc<dyn crate::server::AgentExecutor>) -> Self {
        ServerBuilder {
            executor,
            task_store: None,
            queue_manager: None,
            push_notifications: None,
            agent_card: None,
            cors_enabled: false,
        }
    }

    /// Use a specific task store; in-memory by default.
    pub fn with_task_store(mut self, store: std::sync::Arc<dyn crate::server::TaskStore>) -> Self {
        self.task_store = Some(store);
        self
    }

    /// Use a specific queue manager; in-memory by default.
    pub fn with_queue_manager(
        mut self,
        manager: std::sync::Arc<dyn crate::server::QueueManager>,
    ) -> Self {
        self.queue_manager = Some(manager);
        self
    }

    /// Enable push notification storage and delivery.
    pub fn with_push_notifications(
        mut self,
        store: std::sync::Arc<dyn crate::server::PushNotificationConfigStore>,
        sender: std::sync::Arc<dyn crate::server::PushNotificationSender>,
    ) -> Self {
        self.push_notifications = Some((store, sender));
        self
    }

    /// Shape the agent card through an [`AgentCardBuilder`] callback.
    pub fn with_agent_card<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(AgentCardBuilder) -> AgentCardBuilder,
    {
        let seed = AgentCardBuilder::new("A2A Agent", "An A2A-compatible agent", "1.0.0");
        self.agent_card = Some(configure(seed).build());
        self
    }

    /// Use a finished agent card as-is.
    pub fn with_agent_card_direct(mut self, card: AgentCard) -> Self {
        self.agent_card = Some(card);
        self
    }

    /// Toggle permissive CORS.
    pub fn with_cors(mut self, enabled: bool) -> Self {
        self.cors_enabled = enabled;
        self
    }

    /// Assemble the router.
    pub fn build(self) -> axum::Router {
        use crate::server::{
            a2a_router, DefaultRequestHandler, InMemoryQueueManager, InMemoryTaskStore,
        };
        use std::sync::Arc;

        let store = self
            .task_store
            .unwrap_or_else(|| Arc::new(InMemoryTaskStore::new()));
        let queue_manager = self
            .queue_manager
            .unwrap_or_else(|| Arc::new(InMemoryQueueManager::new()));

        let mut handler = DefaultRequestHandler::with_queue_manager(self.executor, store, queue_manager);
        if let Some((config_store, sender)) = self.push_notifications {
            handler = handler.with_push_notifications(config_store, sender);
        }

        let card = self.agent_card.unwrap_or_else(|| {
            AgentCardBuilder::new("A2A Agent", "An A2A-compatible agent", "1.0.0").build()
        });

        let mut router = a2a_router(Arc::new(handler), card);
        if self.cors_enabled {
            router = router.layer(tower_http::cors::CorsLayer::permissive());
        }
        router
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_builder_fills_protocol_defaults() {
        let card = AgentCardBuilder::new("Test Agent", "A test", "1.0.0")
            .with_jsonrpc_interface("http://localhost:8080/a2a")
            .build();

        assert_eq!(card.url, "http://localhost:8080/a2a");
        assert_eq!(card.preferred_transport, "JSONRPC");
        assert_eq!(card.protocol_version, "0.3.0");
        let interfaces = card.additional_interfaces.unwrap();
        assert_eq!(interfaces.len(), 1);
        assert_eq!(interfaces[0].transport, "JSONRPC");
    }

    #[test]
    fn card_builder_accumulates_skills() {
        let card = AgentCardBuilder::new("Test", "Test", "1.0.0")
            .with_skill("chat", "Chat", "Conversation", vec!["talk".to_string()])
            .with_skill_examples(
                "sum",
                "Summarize",
                "Summaries",
                vec!["text".to_string()],
                vec!["summarize this email".to_string()],
            )
            .build();

        assert_eq!(card.skills.len(), 2);
        assert_eq!(card.skills[1].examples.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn card_builder_sets_capabilities() {
        let card = AgentCardBuilder::new("Test", "Test", "1.0.0")
            .with_streaming(true)
            .with_push_notifications(false)
            .build();

        assert_eq!(card.capabilities.streaming, Some(true));
        assert_eq!(card.capabilities.push_notifications, Some(false));
    }

    #[test]
    fn first_interface_wins_the_primary_url() {
        let card = AgentCardBuilder::new("Test", "Test", "1.0.0")
            .with_interface(AgentInterface {
                url: "grpc://localhost:4000".to_string(),
                transport: "GRPC".to_string(),
            })
            .with_jsonrpc_interface("http://localhost:8080/a2a")
            .build();

        assert_eq!(card.url, "grpc://localhost:4000");
        assert_eq!(card.preferred_transport, "GRPC");
        assert_eq!(card.additional_interfaces.unwrap().len(), 2);
    }
}
