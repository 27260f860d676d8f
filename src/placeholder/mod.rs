//! 占位图生成：找不到图标时根据域名生成固定的 SVG 图案
//! 同一个域名每次生成的内容完全相同

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt::Write;

const WIDTH: u32 = 100;
const HEIGHT: u32 = 100;

type Palette = [&'static str; 5];

const PALETTE_A: Palette = ["#92A1C6", "#146A7C", "#F0AB3D", "#C271B4", "#C20D90"];
const PALETTE_B: Palette = ["#FFAD08", "#EDD75A", "#73B06F", "#0C8F8F", "#405059"];
const PALETTE_C: Palette = ["#EA526F", "#E76B74", "#D7AF70", "#937B63", "#385B59"];
const PALETTE_D: Palette = ["#2A2D34", "#009DDC", "#F26430", "#6761A8", "#009B72"];
const PALETTE_E: Palette = ["#F7C1BB", "#885A5A", "#353A47", "#84B082", "#DC136C"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// 弯曲光束
    Beam,
    /// 稀疏像素格
    Pixel,
    /// 渐变背景加装饰圆
    Sunset,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Beam, Variant::Pixel, Variant::Sunset];

    pub fn name(&self) -> &'static str {
        match self {
            Variant::Beam => "beam",
            Variant::Pixel => "pixel",
            Variant::Sunset => "sunset",
        }
    }

    fn palettes(&self) -> [Palette; 5] {
        match self {
            Variant::Beam => [PALETTE_A, PALETTE_B, PALETTE_C, PALETTE_D, PALETTE_E],
            Variant::Pixel => [PALETTE_B, PALETTE_C, PALETTE_D, PALETTE_E, PALETTE_A],
            Variant::Sunset => [PALETTE_C, PALETTE_D, PALETTE_E, PALETTE_A, PALETTE_B],
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderGenerator;

impl PlaceholderGenerator {
    pub fn new() -> Self {
        Self
    }

    /// 域名的 CRC-32 作为随机种子
    pub fn seed_for(host: &str) -> u32 {
        crc32fast::hash(host.as_bytes())
    }

    pub fn variant_for(host: &str) -> Variant {
        let mut rng = StdRng::seed_from_u64(u64::from(Self::seed_for(host)));
        Variant::ALL[rng.gen_range(0..Variant::ALL.len())]
    }

    pub fn generate(&self, host: &str) -> Vec<u8> {
        let seed = Self::seed_for(host);
        let mut rng = StdRng::seed_from_u64(u64::from(seed));

        let variant = Variant::ALL[rng.gen_range(0..Variant::ALL.len())];
        let palettes = variant.palettes();
        let colors = palettes[rng.gen_range(0..palettes.len())];

        let pattern = match variant {
            Variant::Beam => beam_pattern(&mut rng, &colors),
            Variant::Pixel => pixel_pattern(&mut rng, &colors),
            Variant::Sunset => sunset_pattern(&mut rng, &colors, seed),
        };

        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" version="1.1" width="{WIDTH}" height="{HEIGHT}">{pattern}</svg>"#
        )
        .into_bytes()
    }
}

fn opacity(rng: &mut StdRng, min: u32, max: u32) -> String {
    format!("{:.2}", f64::from(rng.gen_range(min..=max)) / 100.0)
}

fn background(svg: &mut String, fill: &str) {
    let _ = write!(
        svg,
        r#"<rect fill="{fill}" x="0" y="0" width="{WIDTH}" height="{HEIGHT}"/>"#
    );
}

fn beam_pattern(rng: &mut StdRng, colors: &Palette) -> String {
    let mut svg = String::new();
    background(&mut svg, colors[0]);

    for _ in 0..3 {
        let (x1, y1) = (rng.gen_range(0..=WIDTH), rng.gen_range(0..=HEIGHT));
        let (x2, y2) = (rng.gen_range(0..=WIDTH), rng.gen_range(0..=HEIGHT));
        let color = colors[rng.gen_range(1..colors.len())];
        let opacity = opacity(rng, 30, 70);
        let (cx, cy) = (rng.gen_range(0..=WIDTH), rng.gen_range(0..=HEIGHT));
        let stroke_width = rng.gen_range(10..=30);
        let _ = write!(
            svg,
            r#"<path d="M{x1},{y1} Q{cx},{cy} {x2},{y2}" stroke="{color}" stroke-width="{stroke_width}" fill="none" opacity="{opacity}"/>"#
        );
    }
    svg
}

fn pixel_pattern(rng: &mut StdRng, colors: &Palette) -> String {
    const PIXEL: u32 = 10;
    let mut svg = String::new();
    background(&mut svg, colors[0]);

    for x in (0..WIDTH).step_by(PIXEL as usize) {
        for y in (0..HEIGHT).step_by(PIXEL as usize) {
            // 30% 的概率绘制
            if rng.gen_range(0..=100) < 30 {
                let color = colors[rng.gen_range(1..colors.len())];
                let opacity = opacity(rng, 40, 90);
                let _ = write!(
                    svg,
                    r#"<rect fill="{color}" x="{x}" y="{y}" width="{PIXEL}" height="{PIXEL}" opacity="{opacity}"/>"#
                );
            }
        }
    }
    svg
}

fn sunset_pattern(rng: &mut StdRng, colors: &Palette, seed: u32) -> String {
    let mut svg = String::new();
    // 渐变 id 由种子决定，保证输出可复现
    let gradient_id = format!("gradient_{seed:08x}");
    let _ = write!(
        svg,
        r#"<defs><linearGradient id="{gradient_id}" x1="0%" y1="0%" x2="0%" y2="100%"><stop offset="0%" style="stop-color:{}"/><stop offset="100%" style="stop-color:{}"/></linearGradient></defs>"#,
        colors[0], colors[1]
    );
    let _ = write!(
        svg,
        r#"<rect fill="url(#{gradient_id})" x="0" y="0" width="{WIDTH}" height="{HEIGHT}"/>"#
    );

    for _ in 0..3 {
        let color = colors[rng.gen_range(2..colors.len())];
        let opacity = opacity(rng, 20, 40);
        let size = rng.gen_range(20..=40u32);
        let x = rng.gen_range(0..=WIDTH - size);
        let y = rng.gen_range(0..=HEIGHT - size);
        let radius = f64::from(size) / 2.0;
        let _ = write!(
            svg,
            r#"<circle fill="{color}" cx="{}" cy="{}" r="{radius}" opacity="{opacity}"/>"#,
            f64::from(x) + radius,
            f64::from(y) + radius
        );
    }
    svg
}
