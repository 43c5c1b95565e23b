#![cfg_attr(target_arch = "spirv", no_std)]

pub mod composition;
pub mod denoising;
pub mod frame_reprojection;
pub mod ray_marching;
pub mod temporal_accumulation;
