use glam::UVec2;
use log::debug;

use super::Bindable;

#[derive(Debug)]
pub struct Texture {
    tex: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    size: UVec2,
    format: wgpu::TextureFormat,
}

impl Texture {
    pub fn builder(label: impl ToString) -> TextureBuilder {
        TextureBuilder {
            label: label.to_string(),
            size: UVec2::ONE,
            format: wgpu::TextureFormat::Rgba32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            mip_level_count: 1,
        }
    }

    /// Creates a texture that can be both read and written by compute
    /// shaders; that's the kind of texture all of the effect's intermediate
    /// buffers use.
    pub fn new(device: &wgpu::Device, label: impl ToString, size: UVec2) -> Self {
        Self::builder(label)
            .with_size(size)
            .with_usage(wgpu::TextureUsages::STORAGE_BINDING)
            .build(device)
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    /// Uploads texels of given mip level.
    pub fn write(
        &self,
        queue: &wgpu::Queue,
        mip_level: u32,
        size: UVec2,
        bytes_per_texel: u32,
        data: &[u8],
    ) {
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.tex,
                mip_level,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(size.x * bytes_per_texel),
                rows_per_image: None,
            },
            wgpu::Extent3d {
                width: size.x,
                height: size.y,
                depth_or_array_layers: 1,
            },
        );
    }

    pub fn bind_readable(&self) -> impl Bindable + '_ {
        ReadableTexture { view: &self.view }
    }

    pub fn bind_writable(&self) -> impl Bindable + '_ {
        WritableTexture { parent: self }
    }

    /// Binds the texture along with a sampler, for mip-level lookups.
    pub fn bind_sampled(&self) -> impl Bindable + '_ {
        SampledTexture { parent: self }
    }
}

/// Binds a texture view owned by the host (e.g. a G-buffer target).
pub fn bind_view(view: &wgpu::TextureView) -> impl Bindable + '_ {
    ReadableTexture { view }
}

pub struct TextureBuilder {
    label: String,
    size: UVec2,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
    mip_level_count: u32,
}

impl TextureBuilder {
    pub fn with_size(mut self, size: UVec2) -> Self {
        self.size = size;
        self
    }

    pub fn with_format(mut self, format: wgpu::TextureFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_usage(mut self, usage: wgpu::TextureUsages) -> Self {
        self.usage |= usage;
        self
    }

    pub fn with_mip_level_count(mut self, mip_level_count: u32) -> Self {
        self.mip_level_count = mip_level_count;
        self
    }

    pub fn build(self, device: &wgpu::Device) -> Texture {
        let label = format!("ssgi_{}", self.label);

        debug!(
            "Allocating texture `{label}`; size={}x{}, format={:?}, mips={}",
            self.size.x, self.size.y, self.format, self.mip_level_count
        );

        assert!(self.size.x > 0);
        assert!(self.size.y > 0);
        assert!(self.mip_level_count > 0);

        let tex = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("{label}_tex")),
            size: wgpu::Extent3d {
                width: self.size.x,
                height: self.size.y,
                depth_or_array_layers: 1,
            },
            mip_level_count: self.mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.format,
            usage: self.usage,
            view_formats: &[],
        });

        let view = tex.create_view(&Default::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{label}_sampler")),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        });

        Texture {
            tex,
            view,
            sampler,
            size: self.size,
            format: self.format,
        }
    }
}

struct ReadableTexture<'a> {
    view: &'a wgpu::TextureView,
}

impl Bindable for ReadableTexture<'_> {
    fn bind(
        &self,
        binding: u32,
    ) -> Vec<(wgpu::BindGroupLayoutEntry, wgpu::BindingResource)> {
        vec![(
            readable_layout(binding),
            wgpu::BindingResource::TextureView(self.view),
        )]
    }
}

struct WritableTexture<'a> {
    parent: &'a Texture,
}

impl Bindable for WritableTexture<'_> {
    fn bind(
        &self,
        binding: u32,
    ) -> Vec<(wgpu::BindGroupLayoutEntry, wgpu::BindingResource)> {
        let layout = wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT
                | wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::ReadWrite,
                format: self.parent.format,
                view_dimension: wgpu::TextureViewDimension::D2,
            },
            count: None,
        };

        vec![(
            layout,
            wgpu::BindingResource::TextureView(&self.parent.view),
        )]
    }
}

struct SampledTexture<'a> {
    parent: &'a Texture,
}

impl Bindable for SampledTexture<'_> {
    fn bind(
        &self,
        binding: u32,
    ) -> Vec<(wgpu::BindGroupLayoutEntry, wgpu::BindingResource)> {
        let tex_resource = wgpu::BindingResource::TextureView(&self.parent.view);

        let sampler_layout = wgpu::BindGroupLayoutEntry {
            binding: binding + 1,
            visibility: wgpu::ShaderStages::FRAGMENT
                | wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Sampler(
                wgpu::SamplerBindingType::NonFiltering,
            ),
            count: None,
        };

        let sampler_resource =
            wgpu::BindingResource::Sampler(&self.parent.sampler);

        vec![
            (readable_layout(binding), tex_resource),
            (sampler_layout, sampler_resource),
        ]
    }
}

fn readable_layout(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT | wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
        },
        count: None,
    }
}
