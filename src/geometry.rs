//! Reference geometry: full-screen quads and indexed grids.
//!
//! Every setup function creates fresh buffers, leaves the last one bound,
//! enables the attribute arrays it fills, and returns the buffers in upload
//! order. Nothing is deleted; the caller owns the buffers.

use crate::{
    context::GlContext,
    enums,
    report::Reporter,
    session::Session,
    shaders::{DEFAULT_POSITION_LOCATION, DEFAULT_TEXCOORD_LOCATION},
    types::{GridColor, GridVertex, QuadVertex, TexCoord},
};

/// Options for [`setup_quad`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadOptions {
    /// Factor applied to the unit quad's corners.
    pub scale: f32,
    /// Attribute the positions feed.
    pub position_location: u32,
    /// Attribute the texture coordinates feed; none are uploaded if `None`.
    pub texcoord_location: Option<u32>,
    /// Texture coordinate at the `(-1, -1)` corner.
    pub lower_left_tex_coords: [f32; 2],
    /// Texture coordinate at the `(1, 1)` corner.
    pub upper_right_tex_coords: [f32; 2],
}

impl Default for QuadOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            position_location: DEFAULT_POSITION_LOCATION,
            texcoord_location: None,
            lower_left_tex_coords: [0.0, 0.0],
            upper_right_tex_coords: [1.0, 1.0],
        }
    }
}

/// The two triangles covering clip space, times `scale`.
#[must_use]
pub fn quad_positions(scale: f32) -> [QuadVertex; 6] {
    [
        [1.0, 1.0],
        [-1.0, 1.0],
        [-1.0, -1.0],
        [1.0, 1.0],
        [-1.0, -1.0],
        [1.0, -1.0],
    ]
    .map(|[x, y]| QuadVertex {
        position: [x * scale, y * scale],
    })
}

/// Texture coordinates matching [`quad_positions`].
#[must_use]
pub fn quad_tex_coords(lower_left: [f32; 2], upper_right: [f32; 2]) -> [TexCoord; 6] {
    let [llx, lly] = lower_left;
    let [urx, ury] = upper_right;
    [
        [urx, ury],
        [llx, ury],
        [llx, lly],
        [urx, ury],
        [llx, lly],
        [urx, lly],
    ]
    .map(|uv| TexCoord { uv })
}

/// Upload `data` to a new `ARRAY_BUFFER` and point attribute `location` at
/// it as `size` floats per vertex.
fn upload_attribute<C: GlContext>(gl: &C, data: &[u8], location: u32, size: i32) -> Option<C::Buffer> {
    let buffer = gl.create_buffer()?;
    gl.bind_buffer(enums::ARRAY_BUFFER, Some(buffer));
    gl.buffer_data_u8_slice(enums::ARRAY_BUFFER, data, enums::STATIC_DRAW);
    gl.enable_vertex_attrib_array(location);
    gl.vertex_attrib_pointer_f32(location, size, enums::FLOAT, false, 0, 0);
    Some(buffer)
}

/// Upload a quad: positions, then texture coordinates if requested.
pub fn setup_quad<C: GlContext>(gl: &C, options: &QuadOptions) -> Vec<C::Buffer> {
    let mut objects = Vec::new();
    let positions = quad_positions(options.scale);
    objects.extend(upload_attribute(
        gl,
        bytemuck::cast_slice(&positions),
        options.position_location,
        2,
    ));

    if let Some(location) = options.texcoord_location {
        let tex_coords = quad_tex_coords(options.lower_left_tex_coords, options.upper_right_tex_coords);
        objects.extend(upload_attribute(gl, bytemuck::cast_slice(&tex_coords), location, 2));
    }
    objects
}

/// A quad with texture coordinates running from `(0, 0)` to `(1, 1)`.
///
/// Locations default to 0 for positions and 1 for texture coordinates.
pub fn setup_unit_quad<C: GlContext>(
    gl: &C,
    position_location: Option<u32>,
    texcoord_location: Option<u32>,
) -> Vec<C::Buffer> {
    setup_quad_with_tex_coords(gl, [0.0, 0.0], [1.0, 1.0], position_location, texcoord_location)
}

/// A quad with the given corner texture coordinates.
pub fn setup_quad_with_tex_coords<C: GlContext>(
    gl: &C,
    lower_left: [f32; 2],
    upper_right: [f32; 2],
    position_location: Option<u32>,
    texcoord_location: Option<u32>,
) -> Vec<C::Buffer> {
    setup_quad(
        gl,
        &QuadOptions {
            position_location: position_location.unwrap_or(DEFAULT_POSITION_LOCATION),
            texcoord_location: Some(texcoord_location.unwrap_or(DEFAULT_TEXCOORD_LOCATION)),
            lower_left_tex_coords: lower_left,
            upper_right_tex_coords: upper_right,
            ..QuadOptions::default()
        },
    )
}

/// Options for [`setup_indexed_quad_with_options`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedQuadOptions {
    /// Quads across and down. Zero is treated as one.
    pub grid_res: u32,
    /// Attribute the positions feed.
    pub position_location: u32,
    /// Reverse the winding of every second triangle.
    pub flip_odd_triangles: bool,
    /// Added to each coordinate after scaling.
    pub position_offset: f32,
    /// Multiplies each coordinate.
    pub position_mult: f32,
    /// Attribute the vertex colors feed; no colors if `None`.
    pub color_location: Option<u32>,
    /// One color for every vertex instead of the default gradient.
    pub color: Option<[f32; 4]>,
}

impl Default for IndexedQuadOptions {
    fn default() -> Self {
        Self {
            grid_res: 1,
            position_location: DEFAULT_POSITION_LOCATION,
            flip_odd_triangles: false,
            position_offset: 0.0,
            position_mult: 1.0,
            color_location: None,
            color: None,
        }
    }
}

/// CPU-side data of an indexed grid covering clip space.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedGrid {
    /// `(grid_res + 1)²` vertices, row-major from the bottom-left.
    pub positions: Vec<GridVertex>,
    /// One color per vertex, if a color location was given.
    pub colors: Option<Vec<GridColor>>,
    /// Six indices per cell.
    pub indices: Vec<u16>,
}

#[expect(clippy::cast_precision_loss)]
fn ratio(n: usize, d: usize) -> f32 {
    n as f32 / d as f32
}

/// Vertex and index counts of a grid with `res` quads across, saturating
/// rather than overflowing for absurd resolutions.
fn grid_counts(res: usize) -> (usize, usize) {
    let across = res.saturating_add(1);
    let cells = res.saturating_mul(res);
    (across.saturating_mul(across), cells.saturating_mul(6))
}

impl IndexedGrid {
    /// Build the grid described by `options`.
    #[must_use]
    pub fn build(options: &IndexedQuadOptions) -> Self {
        let res = options.grid_res.max(1) as usize;
        let verts_across = res + 1;
        let (vertex_count, index_count) = grid_counts(res);
        let coord = |n: usize| (-1.0 + 2.0 * ratio(n, res)) * options.position_mult + options.position_offset;

        let mut positions = Vec::with_capacity(vertex_count);
        for y in 0..=res {
            for x in 0..=res {
                positions.push(GridVertex {
                    position: [coord(x), coord(y), 0.0],
                });
            }
        }

        let colors = options.color_location.map(|_| {
            let mut colors = Vec::with_capacity(vertex_count);
            for y in 0..=res {
                for x in 0..=res {
                    let rgba = options.color.unwrap_or_else(|| {
                        let (u, v) = (ratio(x, res), ratio(y, res));
                        let alpha = if y % 2 == 0 { 0.5 } else { 1.0 };
                        [u, v, u * v, alpha]
                    });
                    colors.push(GridColor { rgba });
                }
            }
            colors
        });

        let mut indices = Vec::with_capacity(index_count);
        for y in 0..res {
            for x in 0..res {
                let index = y * verts_across + x;
                let mut cell = [
                    index,
                    index + 1,
                    index + verts_across,
                    index + verts_across,
                    index + 1,
                    index + verts_across + 1,
                ];
                if options.flip_odd_triangles {
                    cell.swap(4, 5);
                }
                // Grids past 255 cells across wrap, as a Uint16Array would.
                #[expect(clippy::cast_possible_truncation)]
                indices.extend(cell.map(|i| i as u16));
            }
        }

        Self {
            positions,
            colors,
            indices,
        }
    }
}

/// An indexed grid of `grid_res`² quads with positions only.
pub fn setup_indexed_quad<C: GlContext>(
    gl: &C,
    grid_res: u32,
    position_location: Option<u32>,
    flip_odd_triangles: bool,
) -> Vec<C::Buffer> {
    setup_indexed_quad_with_options(
        gl,
        &IndexedQuadOptions {
            grid_res,
            position_location: position_location.unwrap_or(DEFAULT_POSITION_LOCATION),
            flip_odd_triangles,
            ..IndexedQuadOptions::default()
        },
    )
}

/// Upload an [`IndexedGrid`]: positions (vec3), colors (vec4) if requested,
/// then indices as the bound `ELEMENT_ARRAY_BUFFER`.
pub fn setup_indexed_quad_with_options<C: GlContext>(gl: &C, options: &IndexedQuadOptions) -> Vec<C::Buffer> {
    let grid = IndexedGrid::build(options);
    let mut objects = Vec::new();
    objects.extend(upload_attribute(
        gl,
        bytemuck::cast_slice(&grid.positions),
        options.position_location,
        3,
    ));

    if let (Some(colors), Some(location)) = (&grid.colors, options.color_location) {
        objects.extend(upload_attribute(gl, bytemuck::cast_slice(colors), location, 4));
    }

    if let Some(buffer) = gl.create_buffer() {
        gl.bind_buffer(enums::ELEMENT_ARRAY_BUFFER, Some(buffer));
        gl.buffer_data_u8_slice(
            enums::ELEMENT_ARRAY_BUFFER,
            bytemuck::cast_slice(&grid.indices),
            enums::STATIC_DRAW,
        );
        objects.push(buffer);
    }
    objects
}

impl<R: Reporter> Session<R> {
    /// [`setup_simple_texture_program`](Self::setup_simple_texture_program)
    /// plus a unit quad feeding it.
    pub fn setup_textured_quad<C: GlContext>(
        &mut self,
        gl: &C,
        position_location: Option<u32>,
        texcoord_location: Option<u32>,
        fragment_override: Option<&str>,
    ) -> Option<C::Program> {
        let program =
            self.setup_simple_texture_program(gl, position_location, texcoord_location, fragment_override);
        setup_unit_quad(gl, position_location, texcoord_location);
        program
    }

    /// [`setup_simple_color_program`](Self::setup_simple_color_program) plus
    /// a quad with positions only.
    pub fn setup_color_quad<C: GlContext>(&mut self, gl: &C, position_location: Option<u32>) -> Option<C::Program> {
        let program = self.setup_simple_color_program(gl, position_location);
        setup_quad(
            gl,
            &QuadOptions {
                position_location: position_location.unwrap_or(DEFAULT_POSITION_LOCATION),
                ..QuadOptions::default()
            },
        );
        program
    }

    /// A texture program plus a quad with the given corner texture
    /// coordinates.
    pub fn setup_textured_quad_with_tex_coords<C: GlContext>(
        &mut self,
        gl: &C,
        lower_left: [f32; 2],
        upper_right: [f32; 2],
        position_location: Option<u32>,
        texcoord_location: Option<u32>,
    ) -> Option<C::Program> {
        let program = self.setup_simple_texture_program(gl, position_location, texcoord_location, None);
        setup_quad_with_tex_coords(gl, lower_left, upper_right, position_location, texcoord_location);
        program
    }

    /// The cube-map program plus a unit quad.
    pub fn setup_textured_quad_with_cube_map<C: GlContext>(
        &mut self,
        gl: &C,
        position_location: Option<u32>,
        texcoord_location: Option<u32>,
    ) -> Option<C::Program> {
        let program = self.setup_simple_cube_map_texture_program(gl, position_location, texcoord_location);
        setup_unit_quad(gl, position_location, texcoord_location);
        program
    }
}
