//! Entry point for Cubeview.
//! Parses flags, loads assets (degrading on missing files), runs the loop.

use std::path::{Path, PathBuf};

use anyhow::Result;
use asset::{TextureData, obj, primitives, shader};
use clap::{Parser, ValueEnum};
use corelib::exercise::{Exercise, GeometrySource};
use corelib::{CoreError, CoreResult};
use renderer::{MeshUpload, SceneAssets};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum GpuBackend {
    Auto,
    #[value(alias = "vk")]
    Vulkan,
    #[value(alias = "d3d12")]
    Dx12,
    #[value(alias = "mtl")]
    Metal,
    #[value(aliases = ["opengl", "gles"])]
    Gl,
}

impl GpuBackend {
    fn backends(self) -> wgpu::Backends {
        match self {
            GpuBackend::Auto => wgpu::Backends::all(),
            GpuBackend::Vulkan => wgpu::Backends::VULKAN,
            GpuBackend::Dx12 => wgpu::Backends::DX12,
            GpuBackend::Metal => wgpu::Backends::METAL,
            GpuBackend::Gl => wgpu::Backends::GL,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "cubeview", about = "Textured and lit cube exercises")]
struct Cli {
    /// Exercise to run: cube, textured or lit
    #[arg(long, default_value_t = Exercise::Lit, value_parser = parse_exercise)]
    exercise: Exercise,

    /// Wavefront OBJ mesh (triangulated, p/t/n faces)
    #[arg(long, default_value = "assets/cube.obj")]
    obj: PathBuf,

    /// Texture image (PNG or JPEG)
    #[arg(long, default_value = "assets/cube.png")]
    texture: PathBuf,

    /// WGSL shader source
    #[arg(long, default_value = "assets/shaders/scene.wgsl")]
    shader: PathBuf,

    /// Flat vertex color applied to the loaded mesh, as r,g,b
    #[arg(long, default_value = "0,1,1", value_parser = parse_color)]
    color: [f32; 3],

    /// Window size as WIDTHxHEIGHT
    #[arg(long, default_value = "1280x720", value_parser = parse_size)]
    size: (u32, u32),

    #[arg(long, value_enum, default_value_t = GpuBackend::Auto)]
    gpu_backend: GpuBackend,

    /// Show the frame rate in the window title
    #[arg(long)]
    show_fps: bool,

    /// Upload the OBJ through the deduplicating indexed loader
    #[arg(long)]
    indexed: bool,
}

fn parse_exercise(s: &str) -> CoreResult<Exercise> {
    s.parse()
}

fn parse_color(s: &str) -> CoreResult<[f32; 3]> {
    let invalid = || CoreError::InvalidColor(s.to_owned());
    let parts: Vec<f32> = s
        .split(',')
        .map(|p| p.trim().parse::<f32>().map_err(|_| invalid()))
        .collect::<CoreResult<_>>()?;
    match parts.as_slice() {
        &[r, g, b] if [r, g, b].iter().all(|c| (0.0..=1.0).contains(c)) => Ok([r, g, b]),
        _ => Err(invalid()),
    }
}

fn parse_size(s: &str) -> CoreResult<(u32, u32)> {
    let invalid = || CoreError::InvalidSize(s.to_owned());
    let (w, h) = s
        .split_once('x')
        .or_else(|| s.split_once('X'))
        .ok_or_else(invalid)?;
    let w = w.trim().parse::<u32>().map_err(|_| invalid())?;
    let h = h.trim().parse::<u32>().map_err(|_| invalid())?;
    if w == 0 || h == 0 {
        return Err(invalid());
    }
    Ok((w, h))
}

/// Missing or malformed OBJ files degrade to an empty mesh.
fn load_mesh(cli: &Cli, geometry: GeometrySource) -> MeshUpload {
    match geometry {
        GeometrySource::BuiltinCube => MeshUpload::Expanded(primitives::cube(0.5)),
        GeometrySource::ObjFile if cli.indexed => {
            match obj::load_obj_indexed_from_path(&cli.obj, cli.color) {
                Ok(mesh) => {
                    log::info!(
                        "Loaded {}: {} unique vertices, {} indices",
                        cli.obj.display(),
                        mesh.vertices.len(),
                        mesh.indices.len()
                    );
                    MeshUpload::Indexed(mesh)
                }
                Err(e) => {
                    log::error!("{e}; continuing without geometry");
                    MeshUpload::Indexed(Default::default())
                }
            }
        }
        GeometrySource::ObjFile => match obj::load_obj_from_path(&cli.obj, cli.color) {
            Ok(mesh) => {
                log::info!("Loaded {}: {} vertices", cli.obj.display(), mesh.vertex_count());
                MeshUpload::Expanded(mesh)
            }
            Err(e) => {
                log::error!("{e}; continuing without geometry");
                MeshUpload::Expanded(Default::default())
            }
        },
    }
}

/// Missing images degrade to a checkerboard; untextured exercises bind white.
fn load_texture(path: &Path, textured: bool) -> TextureData {
    if !textured {
        return TextureData::white();
    }
    TextureData::load(path).unwrap_or_else(|e| {
        log::error!("{e:#}; using checkerboard texture");
        TextureData::create_test_texture(64)
    })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let exercise = cli.exercise.config();
    let (width, height) = cli.size;
    log::info!(
        "Starting Cubeview. Exercise: {}, backend: {:?}, show_fps={}, window_size={}x{}",
        cli.exercise,
        cli.gpu_backend,
        cli.show_fps,
        width,
        height
    );

    let assets = SceneAssets {
        mesh: load_mesh(&cli, exercise.geometry),
        texture: load_texture(&cli.texture, exercise.textured),
        shader_source: shader::load_shader_source(&cli.shader)?,
    };

    platform::run(
        platform::PlatformConfig {
            backends: cli.gpu_backend.backends(),
            width,
            height,
            show_fps: cli.show_fps,
            exercise,
        },
        assets,
    )?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}
