//! # Container Task Descriptor
//!
//! The narrow contract an execution backend consumes. A descriptor is a
//! pure adaptation of an [`InvocationConfig`]: no business logic, produced
//! fresh for every execution and owned by exactly that execution, never
//! shared or reused.

use crate::execution::invocation::{InvocationConfig, StdoutSink};
use std::collections::HashMap;

/// Registry credentials for pulling an image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryAuthConfig {
    pub username: String,
    pub password: String,
    pub server_address: String,
}

/// Capability resolving an image reference to registry credentials.
pub trait RegistryAuth: Send + Sync {
    fn auth(&self, image: &str) -> Vec<RegistryAuthConfig>;
}

/// Auth provider for public images: resolves nothing.
pub struct NoAuth;

impl RegistryAuth for NoAuth {
    fn auth(&self, _image: &str) -> Vec<RegistryAuthConfig> {
        Vec::new()
    }
}

/// Label key backends use to correlate function logs with their app.
const LOG_NAME_LABEL: &str = "log_name";

/// What an execution backend needs to run one function, and nothing else.
pub struct ContainerTask {
    id: String,
    command: String,
    image: String,
    env: HashMap<String, String>,
    labels: HashMap<String, String>,
    timeout_seconds: u64,
    volumes: Vec<(String, String)>,
    work_dir: String,
    payload: Option<String>,
    stdout: Option<StdoutSink>,
    auth: Vec<RegistryAuthConfig>,
}

impl ContainerTask {
    /// Adapt an invocation config, resolving credentials for its image
    /// through the injected auth capability.
    pub fn from_config(config: &InvocationConfig, auth: &dyn RegistryAuth) -> Self {
        let mut labels = HashMap::new();
        labels.insert(LOG_NAME_LABEL.to_string(), config.app_name.clone());

        Self {
            id: config.id.clone(),
            command: String::new(),
            image: config.image.clone(),
            env: config.env.clone(),
            labels,
            timeout_seconds: config.timeout.as_secs(),
            volumes: Vec::new(),
            work_dir: String::new(),
            payload: config.payload.clone(),
            stdout: config.stdout.clone(),
            auth: auth.auth(&config.image),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Command override; empty means the image's default entrypoint.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Scheduling group; unused by current backends.
    pub fn group(&self) -> &str {
        ""
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn env_vars(&self) -> &HashMap<String, String> {
        &self.env
    }

    /// Metadata labels for log correlation.
    pub fn labels(&self) -> &HashMap<String, String> {
        &self.labels
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    /// Declared volume mounts; empty in the current scope.
    pub fn volumes(&self) -> &[(String, String)] {
        &self.volumes
    }

    pub fn work_dir(&self) -> &str {
        &self.work_dir
    }

    /// Payload delivered on the function's stdin.
    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    /// Sink for captured stdout, when the submitter wants it back.
    pub fn stdout_sink(&self) -> Option<&StdoutSink> {
        self.stdout.as_ref()
    }

    /// Registry credentials resolved for this task's image.
    pub fn registry_auth(&self) -> &[RegistryAuthConfig] {
        &self.auth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct StaticAuth(RegistryAuthConfig);

    impl RegistryAuth for StaticAuth {
        fn auth(&self, _image: &str) -> Vec<RegistryAuthConfig> {
            vec![self.0.clone()]
        }
    }

    fn config() -> InvocationConfig {
        let mut env = HashMap::new();
        env.insert("KEY".to_string(), "value".to_string());
        InvocationConfig::new("call-1", "myapp", "/hello", "fnserve/hello")
            .with_env(env)
            .with_timeout(Duration::from_secs(10))
            .with_payload(Some("input".to_string()))
    }

    #[test]
    fn test_descriptor_adapts_config() {
        let task = ContainerTask::from_config(&config(), &NoAuth);

        assert_eq!(task.id(), "call-1");
        assert_eq!(task.image(), "fnserve/hello");
        assert_eq!(task.command(), "");
        assert_eq!(task.group(), "");
        assert_eq!(task.work_dir(), "");
        assert_eq!(task.timeout_seconds(), 10);
        assert!(task.volumes().is_empty());
        assert_eq!(task.env_vars().get("KEY").unwrap(), "value");
        assert_eq!(task.labels().get("log_name").unwrap(), "myapp");
        assert_eq!(task.payload(), Some("input"));
        assert!(task.registry_auth().is_empty());
    }

    #[test]
    fn test_descriptor_resolves_auth_for_its_image() {
        let auth = StaticAuth(RegistryAuthConfig {
            username: "user".to_string(),
            password: "secret".to_string(),
            server_address: "registry.example.com".to_string(),
        });
        let task = ContainerTask::from_config(&config(), &auth);

        assert_eq!(task.registry_auth().len(), 1);
        assert_eq!(task.registry_auth()[0].username, "user");
    }
}
