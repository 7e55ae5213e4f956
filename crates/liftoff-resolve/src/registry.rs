//! Component registry: static declarations of what ships where.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{ResolutionError, ResolveResult};

/// Universal root type; the parent walk stops here.
pub const ROOT_COMPONENT: &str = "java.lang.Object";

/// One loadable type and the archive it comes from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Component {
    pub name: String,
    /// Code-source location. `None` for bootstrap types that are always
    /// present on the cluster.
    pub archive: Option<PathBuf>,
    /// Parent component.
    pub extends: Option<String>,
    /// Interfaces declared at this level.
    #[serde(default)]
    pub implements: Vec<String>,
}

impl Component {
    pub fn new(name: impl Into<String>, archive: Option<PathBuf>) -> Self {
        Component {
            name: name.into(),
            archive,
            extends: None,
            implements: Vec::new(),
        }
    }

    pub fn extending(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    pub fn implementing(mut self, interface: impl Into<String>) -> Self {
        self.implements.push(interface.into());
        self
    }
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default, rename = "component")]
    components: Vec<Component>,
}

/// Name → component lookup table.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    components: HashMap<String, Component>,
}

/// Built-in platform table: (component, archive file, parent, interfaces).
/// Archive files are relative to the platform library directory.
const PLATFORM_TABLE: &[(&str, Option<&str>, Option<&str>, &[&str])] = &[
    (ROOT_COMPONENT, None, None, &[]),
    ("java.io.Serializable", None, None, &[]),
    ("liftoff.api.Component", Some("liftoff-api.jar"), None, &[]),
    ("liftoff.api.Operator", Some("liftoff-api.jar"), None, &["liftoff.api.Component"]),
    ("liftoff.api.InputOperator", Some("liftoff-api.jar"), None, &["liftoff.api.Operator"]),
    ("liftoff.api.StreamCodec", Some("liftoff-api.jar"), None, &[]),
    ("liftoff.common.BaseOperator", Some("liftoff-common.jar"), None, &["liftoff.api.Operator", "java.io.Serializable"]),
    ("liftoff.common.FsStorageAgent", Some("liftoff-common.jar"), None, &["java.io.Serializable"]),
    ("liftoff.netlet.Slice", Some("liftoff-netlet.jar"), None, &["java.io.Serializable"]),
    ("liftoff.netlet.EventLoop", Some("liftoff-netlet.jar"), None, &[]),
    ("liftoff.bufferserver.Server", Some("liftoff-bufferserver.jar"), None, &[]),
    ("liftoff.engine.StreamingAppMaster", Some("liftoff-engine.jar"), None, &[]),
    ("javax.validation.ConstraintViolationException", Some("validation-api.jar"), None, &[]),
    ("com.esotericsoftware.kryo.Kryo", Some("kryo.jar"), None, &[]),
    ("com.esotericsoftware.minlog.Log", Some("minlog.jar"), None, &[]),
    ("org.apache.bval.jsr303.ApacheValidationProvider", Some("bval-jsr303.jar"), None, &[]),
    ("org.apache.bval.BeanValidationContext", Some("bval-core.jar"), None, &[]),
    ("org.apache.commons.lang3.ClassUtils", Some("commons-lang3.jar"), None, &[]),
    ("org.apache.commons.beanutils.BeanUtils", Some("commons-beanutils.jar"), None, &[]),
    ("org.apache.http.client.utils.URLEncodedUtils", Some("httpclient.jar"), None, &[]),
    ("org.apache.http.message.BasicHeaderValueParser", Some("httpcore.jar"), None, &[]),
    ("net.engio.mbassy.bus.MBassador", Some("mbassador.jar"), None, &[]),
    ("org.codehaus.jackson.annotate.JsonUnwrapped", Some("jackson-core-asl.jar"), None, &[]),
    ("org.codehaus.jackson.map.ser.std.RawSerializer", Some("jackson-mapper-asl.jar"), None, &[]),
    ("org.apache.xbean.asm5.tree.ClassNode", Some("xbean-asm5-shaded.jar"), None, &[]),
    ("org.jctools.queues.SpscArrayQueue", Some("jctools-core.jar"), None, &[]),
];

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The platform runtime components, with archives under `lib_dir`.
    pub fn builtin(lib_dir: &Path) -> Self {
        let mut registry = Registry::new();
        for (name, archive, parent, interfaces) in PLATFORM_TABLE {
            let mut component = Component::new(*name, archive.map(|file| lib_dir.join(file)));
            component.extends = parent.map(String::from);
            component.implements = interfaces.iter().map(|i| i.to_string()).collect();
            registry.insert(component);
        }
        registry
    }

    /// Load `[[component]]` tables from a TOML file. Relative archive paths
    /// resolve against the file's directory.
    pub fn load(path: &Path) -> ResolveResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ResolutionError::Registry {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml_str(&content, base_dir).map_err(|e| match e {
            ResolutionError::Registry { reason, .. } => ResolutionError::Registry {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    pub fn from_toml_str(content: &str, base_dir: &Path) -> ResolveResult<Self> {
        let file: RegistryFile = toml::from_str(content).map_err(|e| ResolutionError::Registry {
            path: "<inline>".to_string(),
            reason: e.to_string(),
        })?;

        let mut registry = Registry::new();
        for mut component in file.components {
            component.archive = component.archive.map(|archive| {
                if archive.is_relative() {
                    base_dir.join(archive)
                } else {
                    archive
                }
            });
            registry.insert(component);
        }
        Ok(registry)
    }

    /// Insert or replace a component, returning the previous declaration.
    pub fn insert(&mut self, component: Component) -> Option<Component> {
        self.components.insert(component.name.clone(), component)
    }

    /// Add every component of `other`; its declarations win.
    pub fn merge(&mut self, other: Registry) {
        self.components.extend(other.components);
    }

    pub fn get(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }
}
