use anyhow::{Context as AnyhowContext, Result};
use winit::dpi::PhysicalSize;

use formulas::Viewport;

use crate::types::GpuPowerPreference;

/// Window size as last reported, tracked apart from the swapchain, which
/// cannot be configured at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SurfaceSize {
    requested: PhysicalSize<u32>,
    configured: PhysicalSize<u32>,
}

impl SurfaceSize {
    pub(crate) fn new(initial: PhysicalSize<u32>) -> Self {
        Self {
            requested: initial,
            configured: PhysicalSize::new(initial.width.max(1), initial.height.max(1)),
        }
    }

    /// Records a resize. Returns the size to configure, or `None` while the
    /// window has no area.
    pub(crate) fn request(&mut self, size: PhysicalSize<u32>) -> Option<PhysicalSize<u32>> {
        self.requested = size;
        if size.width == 0 || size.height == 0 {
            return None;
        }
        self.configured = size;
        Some(size)
    }

    pub(crate) fn is_presentable(&self) -> bool {
        self.requested.width != 0 && self.requested.height != 0
    }

    pub(crate) fn configured(&self) -> PhysicalSize<u32> {
        self.configured
    }

    /// What the engine draws against; empty while minimised.
    pub(crate) fn viewport(&self) -> Viewport {
        Viewport::new(self.requested.width, self.requested.height)
    }
}

pub(crate) struct GpuContext {
    pub _instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub surface_format: wgpu::TextureFormat,
    pub size: SurfaceSize,
}

impl GpuContext {
    pub(crate) fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        initial_size: PhysicalSize<u32>,
        gpu_power: GpuPowerPreference,
        vsync: bool,
    ) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let surface = instance
            .create_surface(target)
            .context("failed to create rendering surface")?;

        let power_preference = match gpu_power {
            GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
            GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
        };
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let adapter_info = adapter.get_info();
        tracing::debug!(
            name = %adapter_info.name,
            backend = ?adapter_info.backend,
            device_type = ?adapter_info.device_type,
            "selected GPU adapter"
        );

        let limits = adapter.limits();
        let max_dimension = limits.max_texture_dimension_2d;
        let size = SurfaceSize::new(initial_size);
        let requested_width = size.configured().width;
        let requested_height = size.configured().height;
        if requested_width > max_dimension || requested_height > max_dimension {
            anyhow::bail!(
                "GPU max texture dimension is {max_dimension}, requested surface is {requested_width}x{requested_height}"
            );
        }

        let surface_caps = surface.get_capabilities(&adapter);
        let Some(&first_format) = surface_caps.formats.first() else {
            anyhow::bail!("surface reports no supported texture formats");
        };
        // Palettes are authored in display space, so write them unconverted.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .unwrap_or_else(|| {
                tracing::warn!(
                    fallback = ?first_format,
                    "no non-sRGB surface format available; colours will be gamma encoded"
                );
                first_format
            });

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("fractoscope device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")?;

        device.on_uncaptured_error(Box::new(|error| {
            tracing::error!("uncaptured GPU error: {error}");
        }));

        let present_mode = select_present_mode(&surface_caps.present_modes, vsync)
            .context("surface reports no present modes")?;
        tracing::debug!(?present_mode, vsync, "using present mode");

        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: requested_width,
            height: requested_height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            surface_format,
            size,
        })
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        let Some(size) = self.size.request(new_size) else {
            tracing::debug!("surface has no area; deferring frames");
            return;
        };

        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Re-applies the current configuration after the surface was lost or
    /// went out of date. Skipped while the window has no area.
    pub(crate) fn reconfigure(&mut self) {
        if self.size.is_presentable() {
            self.surface.configure(&self.device, &self.config);
        }
    }
}

/// Fifo when vsync is on; otherwise Immediate, then Mailbox, then whatever
/// the surface offers first.
fn select_present_mode(modes: &[wgpu::PresentMode], vsync: bool) -> Option<wgpu::PresentMode> {
    let find = |wanted: wgpu::PresentMode| modes.iter().copied().find(|mode| *mode == wanted);
    let preferred = if vsync {
        find(wgpu::PresentMode::Fifo)
    } else {
        find(wgpu::PresentMode::Immediate).or_else(|| find(wgpu::PresentMode::Mailbox))
    };
    preferred.or_else(|| modes.first().copied())
}
