use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref LABEL_NAMESPACE_REGEX: Regex = Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9._/-]*[A-Za-z0-9])?$")
        .expect("label namespace regex");
}

/// Where the load balancer lives and which services it fronts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Project {
        project_id: String,
        load_balancer_id: String,
    },
    Stack {
        stack_name: String,
        load_balancer_name: String,
    },
    EventStack {
        load_balancer_name: String,
    },
}

impl Scope {
    /// Scopes whose passes need an environment carried by the triggering event.
    pub fn requires_event_context(&self) -> bool {
        matches!(self, Scope::EventStack { .. })
    }
}

/// Services enumerated by one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogScope {
    Project(String),
    AllEnvironments,
    Environment(String),
}

/// How the gateway finds the load balancer service object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadBalancerTarget {
    ById {
        project_id: String,
        id: String,
    },
    ByName {
        environment_id: String,
        name: String,
    },
}

impl std::fmt::Display for LoadBalancerTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadBalancerTarget::ById { project_id, id } => write!(f, "{project_id}/{id}"),
            LoadBalancerTarget::ByName { environment_id, name } => write!(f, "{environment_id}/{name}"),
        }
    }
}

/// Labels recognised on a service, relative to the configured namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKey {
    Register,
    Domain,
    Name,
    ExtPort,
    ServicePort,
    FullName,
}

impl LabelKey {
    pub fn suffix(&self) -> &'static str {
        match self {
            LabelKey::Register => "register",
            LabelKey::Domain => "domain",
            LabelKey::Name => "name",
            LabelKey::ExtPort => "ext_port",
            LabelKey::ServicePort => "service_port",
            LabelKey::FullName => "full_name",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelKeys {
    namespace: String,
}

impl LabelKeys {
    pub fn new(namespace: &str) -> Option<Self> {
        let namespace = namespace.trim().trim_end_matches('.');
        if LABEL_NAMESPACE_REGEX.is_match(namespace) {
            Some(Self { namespace: namespace.to_owned() })
        } else {
            None
        }
    }

    pub fn key(&self, key: LabelKey) -> String {
        format!("{}.{}", self.namespace, key.suffix())
    }
}

impl Default for LabelKeys {
    fn default() -> Self {
        Self { namespace: String::from("rancher.lb.sync") }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelDefaults {
    pub domain: String,
    pub ext_port: u16,
    pub service_port: u16,
}

impl Default for LabelDefaults {
    fn default() -> Self {
        Self {
            domain: String::from("foo.com"),
            ext_port: 80,
            service_port: 3000,
        }
    }
}
