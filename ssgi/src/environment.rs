use std::f32::consts::PI;

use derivative::Derivative;
use glam::{uvec2, vec2, vec4, UVec2, Vec2, Vec3, Vec4, Vec4Swizzles};
use log::info;

use crate::{gpu, EffectError, Result, Texture};

type Sampler<'a> = gpu::EnvironmentSampler<'a, gpu::CpuTexture, gpu::CpuTexture>;

/// Equirectangular HDR environment along with everything needed to sample it
/// on the GPU: a box-filtered mip chain and luminance-based importance
/// sampling tables.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct EnvironmentMap {
    mips: Vec<Mip>,

    #[derivative(Debug = "ignore")]
    conditional: Vec<Vec4>,

    #[derivative(Debug = "ignore")]
    marginal: Vec<Vec4>,
}

#[derive(Clone, Derivative)]
#[derivative(Debug)]
struct Mip {
    size: UVec2,

    #[derivative(Debug = "ignore")]
    texels: Vec<Vec4>,
}

impl EnvironmentMap {
    /// Creates environment map from texels laid out row by row, starting at
    /// the top (+Y) of the sphere.
    pub fn new(width: u32, height: u32, texels: Vec<Vec4>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(EffectError::EnvironmentMap(format!(
                "empty map ({width}x{height})"
            )));
        }

        let len = (width as usize)
            .checked_mul(height as usize)
            .filter(|_| width < u32::MAX && height < u32::MAX)
            .ok_or_else(|| {
                EffectError::EnvironmentMap(format!(
                    "map too large ({width}x{height})"
                ))
            })?;

        if texels.len() != len {
            return Err(EffectError::EnvironmentMap(format!(
                "expected {len} texels for a {width}x{height} map, got {}",
                texels.len()
            )));
        }

        let base = Mip {
            size: uvec2(width, height),
            texels,
        };

        let (conditional, marginal) = build_sampling_tables(&base);
        let mips = build_mips(base);

        Ok(Self {
            mips,
            conditional,
            marginal,
        })
    }

    pub fn from_image(image: &image::DynamicImage) -> Result<Self> {
        let image = image.to_rgba32f();
        let (width, height) = image.dimensions();

        let texels = image
            .pixels()
            .map(|pixel| {
                let [r, g, b, _] = pixel.0;

                vec4(r, g, b, 1.0)
            })
            .collect();

        Self::new(width, height, texels)
    }

    /// Decodes an image file (e.g. Radiance HDR or PNG).
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|err| EffectError::EnvironmentMap(err.to_string()))?;

        Self::from_image(&image)
    }

    /// Converts a cube map into an equirectangular map of `4n x 2n` texels.
    ///
    /// Faces are expected in the +X, -X, +Y, -Y, +Z, -Z order, each being
    /// `face_size x face_size` texels laid out row by row.
    pub fn from_cube_faces(face_size: u32, faces: [&[Vec4]; 6]) -> Result<Self> {
        if face_size == 0 {
            return Err(EffectError::EnvironmentMap("empty cube map".into()));
        }

        let face_len = face_size
            .checked_mul(face_size)
            .filter(|_| face_size <= u32::MAX / 4)
            .ok_or_else(|| {
                EffectError::EnvironmentMap(format!(
                    "cube map too large ({face_size}x{face_size})"
                ))
            })? as usize;

        if let Some(face) = faces.iter().position(|face| face.len() != face_len)
        {
            return Err(EffectError::EnvironmentMap(format!(
                "cube face #{face} has {} texels, expected {face_len}",
                faces[face].len()
            )));
        }

        let size = uvec2(4 * face_size, 2 * face_size);

        let texels = (0..size.y)
            .flat_map(|y| (0..size.x).map(move |x| uvec2(x, y)))
            .map(|pos| {
                let uv = (pos.as_vec2() + 0.5) / size.as_vec2();
                let dir = Sampler::uv_to_dir(uv);
                let (face, face_uv) = cube_face(dir);

                let texel = (face_uv * face_size as f32)
                    .as_uvec2()
                    .min(UVec2::splat(face_size - 1));

                faces[face][(texel.y * face_size + texel.x) as usize]
            })
            .collect();

        Self::new(size.x, size.y, texels)
    }

    pub fn size(&self) -> UVec2 {
        self.mips[0].size
    }

    pub fn mip_count(&self) -> u32 {
        self.mips.len() as u32
    }

    fn conditional_size(&self) -> UVec2 {
        uvec2(self.size().x + 1, self.size().y)
    }

    fn marginal_size(&self) -> UVec2 {
        uvec2(self.size().y + 1, 1)
    }

    pub(crate) fn upload(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> EnvironmentTextures {
        info!(
            "Uploading environment map; size={}x{}, mips={}",
            self.size().x,
            self.size().y,
            self.mip_count()
        );

        let map = Texture::builder("environment_map")
            .with_size(self.size())
            .with_mip_level_count(self.mip_count())
            .with_usage(wgpu::TextureUsages::COPY_DST)
            .build(device);

        for (level, mip) in self.mips.iter().enumerate() {
            map.write(
                queue,
                level as u32,
                mip.size,
                16,
                bytemuck::cast_slice(&mip.texels),
            );
        }

        let conditional = upload_table(
            device,
            queue,
            "environment_conditional",
            self.conditional_size(),
            &self.conditional,
        );

        let marginal = upload_table(
            device,
            queue,
            "environment_marginal",
            self.marginal_size(),
            &self.marginal,
        );

        EnvironmentTextures {
            map,
            conditional,
            marginal,
            size: self.size(),
            max_mip: (self.mip_count() - 1) as f32,
        }
    }

    /// Returns the base level and sampling tables as host textures, for
    /// running the ray marcher without a GPU.
    pub fn to_cpu(&self) -> CpuEnvironment {
        let size = self.size();

        CpuEnvironment {
            map: texture_from_texels(size, &self.mips[0].texels),
            conditional: texture_from_texels(
                self.conditional_size(),
                &self.conditional,
            ),
            marginal: texture_from_texels(self.marginal_size(), &self.marginal),
            size,
        }
    }
}

/// See: [`EnvironmentMap::to_cpu()`].
#[derive(Debug)]
pub struct CpuEnvironment {
    pub map: gpu::CpuTexture,
    pub conditional: gpu::CpuTexture,
    pub marginal: gpu::CpuTexture,
    pub size: UVec2,
}

impl CpuEnvironment {
    pub fn sampler(&self) -> Sampler<'_> {
        gpu::EnvironmentSampler {
            map: &self.map,
            conditional: &self.conditional,
            marginal: &self.marginal,
            size: self.size,
        }
    }
}

/// Environment map residing on the GPU.
#[derive(Debug)]
pub struct EnvironmentTextures {
    pub map: Texture,
    pub conditional: Texture,
    pub marginal: Texture,
    pub size: UVec2,
    pub max_mip: f32,
}

impl EnvironmentTextures {
    /// Creates 1x1 textures bound when there's no environment map; the
    /// shaders don't touch them since the corresponding flag is off.
    pub fn placeholder(device: &wgpu::Device) -> Self {
        let texture = |label: &str| {
            Texture::builder(label)
                .with_size(UVec2::ONE)
                .build(device)
        };

        Self {
            map: texture("environment_map_placeholder"),
            conditional: texture("environment_conditional_placeholder"),
            marginal: texture("environment_marginal_placeholder"),
            size: UVec2::ZERO,
            max_mip: 0.0,
        }
    }
}

fn upload_table(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    size: UVec2,
    texels: &[Vec4],
) -> Texture {
    let texture = Texture::builder(label)
        .with_size(size)
        .with_usage(wgpu::TextureUsages::COPY_DST)
        .build(device);

    texture.write(queue, 0, size, 16, bytemuck::cast_slice(texels));
    texture
}

fn texture_from_texels(size: UVec2, texels: &[Vec4]) -> gpu::CpuTexture {
    gpu::CpuTexture::from_fn(size, |pos| texels[(pos.y * size.x + pos.x) as usize])
}

fn build_mips(base: Mip) -> Vec<Mip> {
    let count = 32 - base.size.max_element().leading_zeros();
    let mut mips = vec![base];

    while (mips.len() as u32) < count {
        let src = &mips[mips.len() - 1];
        let size = (src.size / 2).max(UVec2::ONE);
        let max = src.size - UVec2::ONE;

        let texels = (0..size.y)
            .flat_map(|y| (0..size.x).map(move |x| uvec2(x, y)))
            .map(|pos| {
                let mut sum = Vec4::ZERO;

                for offset in [uvec2(0, 0), uvec2(1, 0), uvec2(0, 1), uvec2(1, 1)] {
                    let src_pos = (pos * 2 + offset).min(max);

                    sum += src.texels[(src_pos.y * src.size.x + src_pos.x) as usize];
                }

                sum / 4.0
            })
            .collect();

        mips.push(Mip { size, texels });
    }

    mips
}

/// Builds the tables described in [`gpu::EnvironmentSampler`]; texels are
/// weighted by their luminance and by the solid angle they cover.
fn build_sampling_tables(base: &Mip) -> (Vec<Vec4>, Vec<Vec4>) {
    use gpu::Vec3Ext;

    let size = base.size;

    let weights: Vec<f32> = base
        .texels
        .iter()
        .enumerate()
        .map(|(idx, texel)| {
            let row = idx as u32 / size.x;
            let lat = (0.5 - (row as f32 + 0.5) / size.y as f32) * PI;

            texel.xyz().max(Vec3::ZERO).luma() * lat.cos()
        })
        .collect();

    let total: f32 = weights.iter().sum();

    let rows: Vec<&[f32]> = weights.chunks(size.x as usize).collect();
    let row_weights: Vec<f32> = rows.iter().map(|row| row.iter().sum()).collect();

    let marginal = cumulative_distribution(&row_weights)
        .into_iter()
        .map(|c| vec4(c, 0.0, 0.0, 0.0))
        .collect();

    let mut conditional =
        Vec::with_capacity(((size.x + 1) * size.y) as usize);

    for row in &rows {
        let cdf = cumulative_distribution(row);

        for (col, c) in cdf.into_iter().enumerate() {
            let probability = match row.get(col) {
                Some(weight) if total > 0.0 => weight / total,
                Some(_) => 1.0 / weights.len() as f32,
                None => 0.0,
            };

            conditional.push(vec4(c, probability, 0.0, 0.0));
        }
    }

    (conditional, marginal)
}

/// Returns `weights.len() + 1` boundaries of the normalized cumulative
/// distribution, from exactly `0.0` to exactly `1.0`; all-zero weights are
/// treated as uniform.
fn cumulative_distribution(weights: &[f32]) -> Vec<f32> {
    let n = weights.len();
    let total: f32 = weights.iter().sum();

    let mut cdf = Vec::with_capacity(n + 1);
    let mut acc = 0.0;

    cdf.push(0.0);

    for (idx, weight) in weights.iter().enumerate() {
        acc += if total > 0.0 {
            weight / total
        } else {
            1.0 / n as f32
        };

        cdf.push(if idx + 1 == n { 1.0 } else { acc.min(1.0) });
    }

    cdf
}

/// Returns index of the cube face pierced by `dir`, along with the
/// uv-coordinates on that face.
fn cube_face(dir: Vec3) -> (usize, Vec2) {
    let abs = dir.abs();

    let (face, sc, tc, ma) = if abs.x >= abs.y && abs.x >= abs.z {
        if dir.x > 0.0 {
            (0, -dir.z, -dir.y, abs.x)
        } else {
            (1, dir.z, -dir.y, abs.x)
        }
    } else if abs.y >= abs.z {
        if dir.y > 0.0 {
            (2, dir.x, dir.z, abs.y)
        } else {
            (3, dir.x, -dir.z, abs.y)
        }
    } else if dir.z > 0.0 {
        (4, dir.x, -dir.y, abs.z)
    } else {
        (5, -dir.x, -dir.y, abs.z)
    };

    (face, vec2(sc / ma + 1.0, tc / ma + 1.0) * 0.5)
}
