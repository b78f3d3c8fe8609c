/// What [`GpuContext::acquire`](super::GpuContext::acquire) asks the platform for.
///
/// The defaults target the widest range of adapters, software ones included
/// when `force_fallback_adapter` is set.
#[derive(Debug, Clone)]
pub struct DeviceInit {
    /// Backends the instance may pick from.
    ///
    /// `WGPU_BACKEND` in the environment narrows this further.
    pub backends: wgpu::Backends,

    /// Adapter preference. `WGPU_POWER_PREF` overrides it when set.
    pub power_preference: wgpu::PowerPreference,

    /// Accept a software adapter when no hardware adapter is present.
    ///
    /// Useful on CI machines; the result is still a real device.
    pub force_fallback_adapter: bool,

    /// Features the device must support. Nothing in kiln needs any.
    pub required_features: wgpu::Features,

    /// Limits requested from the device.
    ///
    /// Resolution-dependent limits are raised to what the adapter supports.
    pub required_limits: wgpu::Limits,

    /// Debug label attached to the logical device.
    pub label: &'static str,
}

impl Default for DeviceInit {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults(),
            label: "kiln device",
        }
    }
}

impl DeviceInit {
    /// Same as the default, but asks for a software adapter.
    pub fn fallback() -> Self {
        Self {
            force_fallback_adapter: true,
            ..Self::default()
        }
    }
}
