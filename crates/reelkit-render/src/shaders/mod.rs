//! Bundled WGSL programs.

use crate::shader::{ProgramLayout, ProgramSource};

pub const REEL_VERTEX: &str = include_str!("reel.vert.wgsl");
pub const REEL_FRAGMENT: &str = include_str!("reel.frag.wgsl");
pub const OVERLAY_VERTEX: &str = include_str!("overlay.vert.wgsl");
pub const OVERLAY_FRAGMENT: &str = include_str!("overlay.frag.wgsl");
pub const PARTICLE_VERTEX: &str = include_str!("particle.vert.wgsl");
pub const PARTICLE_FRAGMENT: &str = include_str!("particle.frag.wgsl");

/// Name, source and layout of every program the display needs.
pub fn builtin_programs() -> [(&'static str, ProgramSource, ProgramLayout); 3] {
    [
        ("reels", ProgramSource::new(REEL_VERTEX, REEL_FRAGMENT), ProgramLayout::Textured),
        ("overlay", ProgramSource::new(OVERLAY_VERTEX, OVERLAY_FRAGMENT), ProgramLayout::Colored),
        (
            "particles",
            ProgramSource::new(PARTICLE_VERTEX, PARTICLE_FRAGMENT),
            ProgramLayout::Particles,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::link_program;

    #[test]
    fn test_all_shaders_parse() {
        for source in [
            REEL_VERTEX,
            REEL_FRAGMENT,
            OVERLAY_VERTEX,
            OVERLAY_FRAGMENT,
            PARTICLE_VERTEX,
            PARTICLE_FRAGMENT,
        ] {
            naga::front::wgsl::parse_str(source).expect("bundled shader failed to parse");
        }
    }

    #[test]
    fn test_builtin_programs_link() {
        for (name, source, _) in builtin_programs() {
            if let Err(e) = link_program(name, &source) {
                panic!("{e}");
            }
        }
    }
}
