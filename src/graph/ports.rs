use smallvec::SmallVec;

use crate::foundation::core::Rgba;
use crate::render::arena::TextureHandle;
use crate::texture::format::TextureDimension;

/// Value type a port carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PortType {
    /// A texture of the given dimension.
    Texture(TextureDimension),
    /// Scalar.
    Float,
    /// Linear RGBA color.
    Color,
    /// Four-component vector.
    Vector4,
}

impl PortType {
    /// Return `true` when a value produced by `from` can feed a port of this type.
    ///
    /// Textures must match dimensions; scalars, colors and vectors convert between each other.
    pub fn accepts(self, from: Self) -> bool {
        match (self, from) {
            (Self::Texture(a), Self::Texture(b)) => a == b,
            (Self::Texture(_), _) | (_, Self::Texture(_)) => false,
            _ => true,
        }
    }
}

impl std::fmt::Display for PortType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Texture(d) => write!(f, "Texture<{d}>"),
            Self::Float => write!(f, "Float"),
            Self::Color => write!(f, "Color"),
            Self::Vector4 => write!(f, "Vector4"),
        }
    }
}

/// Value carried on an edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PortValue {
    /// Texture owned by the producing node.
    Texture(TextureHandle),
    /// Scalar.
    Float(f32),
    /// Color.
    Color(Rgba),
    /// Vector.
    Vector4([f32; 4]),
}

impl PortValue {
    /// Texture handle, if this is a texture value.
    pub fn texture(self) -> Option<TextureHandle> {
        match self {
            Self::Texture(t) => Some(t),
            _ => None,
        }
    }

    /// Scalar view. Vectors and colors contribute their first component.
    pub fn as_float(self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(v),
            Self::Vector4(v) => Some(v[0]),
            Self::Color(c) => Some(c.r),
            Self::Texture(_) => None,
        }
    }

    /// Vector view. Scalars are splatted.
    pub fn as_vector(self) -> Option<[f32; 4]> {
        match self {
            Self::Float(v) => Some([v; 4]),
            Self::Vector4(v) => Some(v),
            Self::Color(c) => Some(c.to_array()),
            Self::Texture(_) => None,
        }
    }

    /// Color view. Scalars are splatted.
    pub fn as_color(self) -> Option<Rgba> {
        self.as_vector().map(Rgba::from_array)
    }
}

/// One declared port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortSpec {
    /// Port name, unique per direction within a node.
    pub name: &'static str,
    /// Carried type.
    pub ty: PortType,
    /// Inputs only: processing succeeds without a connection.
    pub optional: bool,
}

impl PortSpec {
    /// Required port.
    pub fn new(name: &'static str, ty: PortType) -> Self {
        Self {
            name,
            ty,
            optional: false,
        }
    }

    /// Optional input port.
    pub fn optional(name: &'static str, ty: PortType) -> Self {
        Self {
            name,
            ty,
            optional: true,
        }
    }
}

/// Inputs and outputs of a node, as described for its current settings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodePorts {
    /// Input ports.
    pub inputs: SmallVec<[PortSpec; 4]>,
    /// Output ports.
    pub outputs: SmallVec<[PortSpec; 4]>,
}

impl NodePorts {
    /// Find an input by name.
    pub fn input(&self, name: &str) -> Option<&PortSpec> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Find an output by name.
    pub fn output(&self, name: &str) -> Option<&PortSpec> {
        self.outputs.iter().find(|p| p.name == name)
    }
}

/// A `(node, port)` endpoint of an edge.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortRef {
    /// Node.
    pub node: crate::graph::model::NodeId,
    /// Port name.
    pub port: String,
}

impl PortRef {
    /// Build an endpoint.
    pub fn new(node: crate::graph::model::NodeId, port: impl Into<String>) -> Self {
        Self {
            node,
            port: port.into(),
        }
    }
}

impl std::fmt::Display for PortRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.node, self.port)
    }
}
