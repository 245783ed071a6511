//! Color gradients for per-vertex arc shading.

use eframe::egui::Color32;

/// Parses a CSS hex color (`#rgb`, `#rrggbb` or `#rrggbbaa`).
pub fn parse_color(value: &str) -> Option<Color32> {
    let hex = value.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();

    match hex.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                rgb[i] = v * 17;
            }
            Some(Color32::from_rgb(rgb[0], rgb[1], rgb[2]))
        }
        6 => Some(Color32::from_rgb(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        8 => Some(Color32::from_rgba_unmultiplied(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            channel(&hex[6..8])?,
        )),
        _ => None,
    }
}

/// Interpolates `samples` colors from `start` to `end`, both inclusive.
///
/// Channels are blended unmultiplied, so translucent endpoints keep their hue.
pub fn gradient_steps(start: Color32, end: Color32, samples: usize) -> Vec<Color32> {
    match samples {
        0 => Vec::new(),
        1 => vec![start],
        _ if start == end => vec![start; samples],
        _ => {
            let from = start.to_srgba_unmultiplied();
            let to = end.to_srgba_unmultiplied();
            let last = (samples - 1) as f32;
            (0..samples)
                .map(|i| {
                    let t = i as f32 / last;
                    let lerp = |c: usize| {
                        (from[c] as f32 + (to[c] as f32 - from[c] as f32) * t).round() as u8
                    };
                    if i == 0 {
                        start
                    } else if i == samples - 1 {
                        end
                    } else {
                        Color32::from_rgba_unmultiplied(lerp(0), lerp(1), lerp(2), lerp(3))
                    }
                })
                .collect()
        }
    }
}
