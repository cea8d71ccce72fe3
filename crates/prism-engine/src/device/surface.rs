use winit::dpi::PhysicalSize;

use crate::present::{AcquireError, SurfaceSize};

pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    if caps.formats.is_empty() {
        return None;
    }

    if prefer_srgb {
        let preferred = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ];
        for f in preferred {
            if caps.formats.contains(&f) {
                return Some(f);
            }
        }
    }

    Some(caps.formats[0])
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// Records `new_size` and reconfigures the surface.
///
/// wgpu rejects 0x0 configurations; in that case only the recorded size changes.
pub(crate) fn apply_resize(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    config: &mut wgpu::SurfaceConfiguration,
    size: &mut PhysicalSize<u32>,
    new_size: PhysicalSize<u32>,
) {
    *size = new_size;
    if new_size.width == 0 || new_size.height == 0 {
        return;
    }

    config.width = new_size.width;
    config.height = new_size.height;

    surface.configure(device, config);
    log::info!("surface configured at {}x{}", new_size.width, new_size.height);
}

/// Size the surface must be reconfigured to before acquiring at `requested`,
/// or `None` when the current configuration already matches.
pub(crate) fn reconfigure_size(
    requested: SurfaceSize,
    current: PhysicalSize<u32>,
) -> Option<PhysicalSize<u32>> {
    let requested = PhysicalSize::new(requested.width, requested.height);
    (requested != current).then_some(requested)
}

/// Classifies a wgpu acquisition error.
pub(crate) fn acquire_error(err: wgpu::SurfaceError) -> AcquireError {
    match err {
        wgpu::SurfaceError::Lost => AcquireError::Lost,
        wgpu::SurfaceError::Outdated => AcquireError::Outdated,
        wgpu::SurfaceError::OutOfMemory => AcquireError::OutOfMemory,
        wgpu::SurfaceError::Timeout => AcquireError::Timeout,
        wgpu::SurfaceError::Other => AcquireError::Other(err.to_string()),
    }
}

/// Converts a wgpu acquisition error, reconfiguring the surface when it was
/// lost or outdated so the next acquire can succeed.
pub(crate) fn map_surface_error(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    err: wgpu::SurfaceError,
) -> AcquireError {
    let kind = acquire_error(err);
    if matches!(kind, AcquireError::Lost | AcquireError::Outdated)
        && size.width > 0
        && size.height > 0
    {
        surface.configure(device, config);
    }
    kind
}
