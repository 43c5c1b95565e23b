/// Textures rendered by the host each frame, all of them sized as
/// [`crate::Camera::size`].
///
/// The views are kept alive by the effect and bound directly, so the host
/// must keep rendering into the same textures; switching to other ones
/// requires calling [`crate::Effect::set_inputs()`].
#[derive(Debug)]
pub struct EffectInputs {
    /// Non-linear depth packed into an `Rgba8Unorm` target
    pub depth: wgpu::TextureView,

    /// View-space normal (xyz) and roughness (w)
    pub normal: wgpu::TextureView,

    /// Albedo (rgb) and metalness (a)
    pub albedo: wgpu::TextureView,

    pub emissive: wgpu::TextureView,

    /// Motion vectors in uv-units, as `current uv - previous uv`
    pub motion: wgpu::TextureView,

    /// Directly-lit frame; required for composition
    pub direct_light: wgpu::TextureView,

    /// Depth of back faces, packed the same way as [`Self::depth`]; enables
    /// the `autoThickness` option
    pub back_depth: Option<wgpu::TextureView>,
}
