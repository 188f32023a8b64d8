use std::sync::Arc;

/// Errors produced by the graphics context and renderer resource management.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphicsError {
    /// No adapter matched the requested options.
    NoAdapter(String),
    /// The adapter refused to create a device.
    DeviceRequest(String),
    /// A surface could not be acquired or configured.
    Surface(String),
    /// Pixel data does not match the declared texture dimensions.
    InvalidTextureData { expected: usize, actual: usize },
    /// A texture with a zero dimension was requested.
    InvalidTextureSize { width: u32, height: u32 },
    /// An update would write past the end of a dynamic buffer.
    BufferOverflow {
        buffer: String,
        capacity: u64,
        requested: u64,
    },
    /// A handle does not refer to a live resource.
    UnknownResource { kind: &'static str, id: u32 },
    /// A draw call is missing a binding its program needs.
    MissingBinding { program: String, binding: &'static str },
    /// The renderer has been destroyed.
    Destroyed,
    /// Reading pixels back from an offscreen target failed.
    Readback(String),
}

impl std::fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphicsError::NoAdapter(msg) => write!(f, "Failed to find a suitable GPU adapter: {}", msg),
            GraphicsError::DeviceRequest(msg) => write!(f, "Failed to create device: {}", msg),
            GraphicsError::Surface(msg) => write!(f, "Surface error: {}", msg),
            GraphicsError::InvalidTextureData { expected, actual } => {
                write!(f, "Texture data has {} bytes, expected {}", actual, expected)
            }
            GraphicsError::InvalidTextureSize { width, height } => {
                write!(f, "Invalid texture size {}x{}", width, height)
            }
            GraphicsError::BufferOverflow {
                buffer,
                capacity,
                requested,
            } => write!(
                f,
                "Write of {} bytes overflows buffer '{}' with capacity {}",
                requested, buffer, capacity
            ),
            GraphicsError::UnknownResource { kind, id } => write!(f, "Unknown {} handle {}", kind, id),
            GraphicsError::MissingBinding { program, binding } => {
                write!(f, "Draw with program '{}' is missing its {}", program, binding)
            }
            GraphicsError::Destroyed => write!(f, "Renderer has been destroyed"),
            GraphicsError::Readback(msg) => write!(f, "Readback failed: {}", msg),
        }
    }
}

impl std::error::Error for GraphicsError {}

pub type GraphicsResult<T> = Result<T, GraphicsError>;

/// Options used when creating a [`GraphicsContext`].
#[derive(Debug, Clone)]
pub struct GraphicsContextDescriptor {
    pub backends: wgpu::Backends,
    pub power_preference: wgpu::PowerPreference,
    pub force_fallback_adapter: bool,
    pub limits: wgpu::Limits,
    pub label: Option<&'static str>,
}

impl Default for GraphicsContextDescriptor {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            limits: wgpu::Limits::default(),
            label: Some("reelkit device"),
        }
    }
}

/// A shared wgpu instance, adapter, device and queue.
///
/// ```rust,no_run
/// use reelkit_render::GraphicsContext;
///
/// let ctx = GraphicsContext::new_owned_sync().expect("no GPU");
/// let ctx2 = ctx.clone(); // Cheap clone (Arc)
/// ```
pub struct GraphicsContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GraphicsContext {
    /// Creates a new graphics context with default options.
    pub async fn new_owned() -> GraphicsResult<Arc<Self>> {
        Self::new_owned_with_descriptor(GraphicsContextDescriptor::default()).await
    }

    /// Creates a new graphics context synchronously, blocking on the async setup.
    pub fn new_owned_sync() -> GraphicsResult<Arc<Self>> {
        pollster::block_on(Self::new_owned())
    }

    pub async fn new_owned_with_descriptor(descriptor: GraphicsContextDescriptor) -> GraphicsResult<Arc<Self>> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: descriptor.backends,
            ..Default::default()
        });
        Self::from_instance(instance, None, descriptor).await.map(Arc::new)
    }

    /// Creates a context whose adapter is compatible with `surface`.
    ///
    /// The surface must have been created from `instance`.
    pub async fn for_surface(
        instance: wgpu::Instance,
        surface: &wgpu::Surface<'_>,
        descriptor: GraphicsContextDescriptor,
    ) -> GraphicsResult<Arc<Self>> {
        Self::from_instance(instance, Some(surface), descriptor).await.map(Arc::new)
    }

    async fn from_instance(
        instance: wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'_>>,
        descriptor: GraphicsContextDescriptor,
    ) -> GraphicsResult<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: descriptor.power_preference,
                compatible_surface,
                force_fallback_adapter: descriptor.force_fallback_adapter,
            })
            .await
            .map_err(|e| GraphicsError::NoAdapter(e.to_string()))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_limits: descriptor.limits.clone(),
                label: descriptor.label,
                ..Default::default()
            })
            .await
            .map_err(|e| GraphicsError::DeviceRequest(e.to_string()))?;

        tracing::info!("Created graphics context on adapter {:?}", adapter.get_info().name);

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Get device info
    pub fn info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Get the maximum 2D texture dimension.
    #[inline]
    pub fn max_texture_dimension_2d(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }
}
