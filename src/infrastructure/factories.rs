use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::domain::ports::agent::*;
use crate::domain::ports::notification::*;
use crate::domain::ports::process::*;
use crate::domain::ports::repository::*;
use crate::domain::services::{BounceTiming, ReconfigurationAgent};

use super::notification::*;
use super::powershell::*;
use super::process::*;
use super::storage::*;

// ============================================================================
// ADAPTER FACTORY TRAIT
// ============================================================================

/// Factory trait for creating infrastructure adapters
pub trait AdapterFactory {
    type ProcessExecutor: ProcessExecutor + Send + Sync;
    type SystemInfo: SystemInfo + Send + Sync;

    type AgentChannel: AgentChannel + Send + Sync;
    type AdapterConfigAgent: AdapterConfigAgent + Send + Sync;

    type ProfileStore: ProfileStore + Send + Sync;

    type UserNotification: UserNotification + Send + Sync;
    type StatusSink: StatusSink + Send + Sync;

    fn create_process_executor(&self) -> Self::ProcessExecutor;
    fn create_system_info(&self) -> Self::SystemInfo;

    fn create_agent_channel(&self) -> Self::AgentChannel;
    fn create_adapter_config_agent(&self) -> Self::AdapterConfigAgent;

    fn create_profile_store(&self) -> Self::ProfileStore;

    fn create_user_notification(&self) -> Self::UserNotification;
    fn create_status_sink(&self) -> Self::StatusSink;
}

// ============================================================================
// STANDARD ADAPTER FACTORY
// ============================================================================

/// Standard factory implementation using all concrete adapters
pub struct StandardAdapterFactory {
    config: FactoryConfig,
}

/// Configuration for the adapter factory
#[derive(Debug, Clone)]
pub struct FactoryConfig {
    pub powershell_path: String,
    pub elevation_command: Option<String>,
    pub agent_timeout: Duration,
    pub bounce_timing: BounceTiming,
    pub profile_store_path: PathBuf,
    pub use_colors: bool,
    pub emoji_enabled: bool,
    pub assume_yes: bool,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}

impl FactoryConfig {
    pub fn from_app_config(app: &AppConfig) -> Self {
        Self {
            powershell_path: app.powershell_path.clone(),
            elevation_command: app.elevation_command.clone(),
            agent_timeout: app.agent_timeout(),
            bounce_timing: app.bounce_timing(),
            profile_store_path: app.profile_store_path.clone(),
            use_colors: app.enable_colors,
            emoji_enabled: app.enable_emoji,
            assume_yes: false,
        }
    }
}

pub type PowerShellAgent = ReconfigurationAgent<PowerShellChannel<TokioProcessExecutor, StandardSystemInfo>>;

impl AdapterFactory for StandardAdapterFactory {
    type ProcessExecutor = TokioProcessExecutor;
    type SystemInfo = StandardSystemInfo;

    type AgentChannel = PowerShellChannel<TokioProcessExecutor, StandardSystemInfo>;
    type AdapterConfigAgent = PowerShellAgent;

    type ProfileStore = JsonProfileStore;

    type UserNotification = ConsoleUserNotification;
    type StatusSink = ConsoleStatusSink;

    fn create_process_executor(&self) -> Self::ProcessExecutor {
        TokioProcessExecutor::new()
    }

    fn create_system_info(&self) -> Self::SystemInfo {
        StandardSystemInfo::new()
    }

    fn create_agent_channel(&self) -> Self::AgentChannel {
        PowerShellChannel::new(self.create_process_executor(), self.create_system_info())
            .with_powershell_path(self.config.powershell_path.clone())
            .with_elevation_command(self.config.elevation_command.clone())
            .with_timeout(self.config.agent_timeout)
    }

    fn create_adapter_config_agent(&self) -> Self::AdapterConfigAgent {
        ReconfigurationAgent::new(self.create_agent_channel()).with_timing(self.config.bounce_timing)
    }

    fn create_profile_store(&self) -> Self::ProfileStore {
        JsonProfileStore::new(self.config.profile_store_path.clone())
    }

    fn create_user_notification(&self) -> Self::UserNotification {
        ConsoleUserNotification::new()
            .with_colors(self.config.use_colors)
            .with_emoji(self.config.emoji_enabled)
            .with_assume_yes(self.config.assume_yes)
    }

    fn create_status_sink(&self) -> Self::StatusSink {
        ConsoleStatusSink::new()
            .with_colors(self.config.use_colors)
            .with_emoji(self.config.emoji_enabled)
    }
}

impl StandardAdapterFactory {
    pub fn new(config: FactoryConfig) -> Self {
        Self { config }
    }
}

// ============================================================================
// DEPENDENCY CONTAINER
// ============================================================================

/// Container holding all infrastructure dependencies
pub struct DependencyContainer {
    factory: StandardAdapterFactory,

    // Cached instances (using Arc for shared ownership)
    adapter_config_agent: Option<Arc<dyn AdapterConfigAgent + Send + Sync>>,
    profile_store: Option<Arc<dyn ProfileStore + Send + Sync>>,
    user_notification: Option<Arc<dyn UserNotification + Send + Sync>>,
    status_sink: Option<Arc<dyn StatusSink + Send + Sync>>,
}

impl DependencyContainer {
    pub fn new(factory: StandardAdapterFactory) -> Self {
        Self {
            factory,
            adapter_config_agent: None,
            profile_store: None,
            user_notification: None,
            status_sink: None,
        }
    }

    // Lazy initialization with caching
    pub fn adapter_config_agent(&mut self) -> Arc<dyn AdapterConfigAgent + Send + Sync> {
        let factory = &self.factory;
        self.adapter_config_agent
            .get_or_insert_with(|| Arc::new(factory.create_adapter_config_agent()))
            .clone()
    }

    pub fn profile_store(&mut self) -> Arc<dyn ProfileStore + Send + Sync> {
        let factory = &self.factory;
        self.profile_store
            .get_or_insert_with(|| Arc::new(factory.create_profile_store()))
            .clone()
    }

    pub fn user_notification(&mut self) -> Arc<dyn UserNotification + Send + Sync> {
        let factory = &self.factory;
        self.user_notification
            .get_or_insert_with(|| Arc::new(factory.create_user_notification()))
            .clone()
    }

    pub fn status_sink(&mut self) -> Arc<dyn StatusSink + Send + Sync> {
        let factory = &self.factory;
        self.status_sink
            .get_or_insert_with(|| Arc::new(factory.create_status_sink()))
            .clone()
    }
}

// ============================================================================
// BUILDER PATTERN FOR FACTORY CONFIG
// ============================================================================

impl FactoryConfig {
    pub fn builder() -> FactoryConfigBuilder {
        FactoryConfigBuilder::new()
    }
}

pub struct FactoryConfigBuilder {
    config: FactoryConfig,
}

impl FactoryConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: FactoryConfig::default(),
        }
    }

    pub fn from_app_config(app: &AppConfig) -> Self {
        Self {
            config: FactoryConfig::from_app_config(app),
        }
    }

    pub fn profile_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.profile_store_path = path.into();
        self
    }

    pub fn disable_colors(mut self) -> Self {
        self.config.use_colors = false;
        self
    }

    pub fn disable_emoji(mut self) -> Self {
        self.config.emoji_enabled = false;
        self
    }

    pub fn assume_yes(mut self, assume_yes: bool) -> Self {
        self.config.assume_yes = assume_yes;
        self
    }

    pub fn build(self) -> FactoryConfig {
        self.config
    }
}

impl Default for FactoryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// CONVENIENCE FUNCTIONS
// ============================================================================

/// Create a dependency container with custom configuration
pub fn create_container_with_config(config: FactoryConfig) -> DependencyContainer {
    let factory = StandardAdapterFactory::new(config);
    DependencyContainer::new(factory)
}
