use std::path::Path;

use umbra_core::internal::*;

/// How the model file is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Binary,
    Text,
}

impl ModelFormat {
    /// `auto` picks text for `.json`, `.txt` and `.pbtxt` files, binary
    /// otherwise.
    pub fn for_path(hint: &str, path: &Path) -> UmbraResult<ModelFormat> {
        match hint {
            "bin" => Ok(ModelFormat::Binary),
            "text" => Ok(ModelFormat::Text),
            "auto" => {
                let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
                Ok(if ["json", "txt", "pbtxt"].contains(&ext) {
                    ModelFormat::Text
                } else {
                    ModelFormat::Binary
                })
            }
            _ => bail!("Unknown model format {}", hint),
        }
    }
}

fn parse_shape(s: &str) -> UmbraResult<TVec<usize>> {
    if s.is_empty() {
        return Ok(tvec!());
    }
    s.split(',')
        .map(|d| d.trim().parse::<usize>().with_context(|| format!("Invalid dimension {:?}", d)))
        .collect()
}

fn split_named(spec: &str) -> UmbraResult<(&str, &str)> {
    let (name, rest) =
        spec.split_once('=').with_context(|| format!("Expected name=..., got {}", spec))?;
    ensure!(!name.is_empty(), "Empty blob name in {}", spec);
    Ok((name, rest))
}

/// Parse `name=1,3,8,8`.
pub fn parse_shape_spec(spec: &str) -> UmbraResult<(String, TVec<usize>)> {
    let (name, shape) = split_named(spec)?;
    Ok((name.to_string(), parse_shape(shape)?))
}

/// Parse `name=f32:1,3,4,4:0.5` into a tensor filled with the value. The
/// value defaults to 0.
pub fn parse_input_spec(spec: &str) -> UmbraResult<(String, Tensor)> {
    let (name, rest) = split_named(spec)?;
    let mut parts = rest.splitn(3, ':');
    let dt: DatumType = parts.next().unwrap_or_default().parse()?;
    let shape = parse_shape(parts.next().with_context(|| format!("Missing shape in {}", spec))?)?;
    let value = parts.next().unwrap_or("0");
    let mut tensor = Tensor::zero_dt(dt, &shape)?;
    match dt {
        DatumType::F32 => tensor.fill(value.parse::<f32>()?)?,
        DatumType::I32 => tensor.fill(value.parse::<i32>()?)?,
        DatumType::U8 => tensor.fill(value.parse::<u8>()?)?,
    }
    Ok((name.to_string(), tensor))
}
