use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
};

use super::csr::CsrGraph;

pub fn read_u32_bin(path: &Path) -> Result<Vec<u32>, String> {
    let mut f = File::open(path).map_err(|e| format!("open {:?}: {e}", path))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf).map_err(|e| format!("read {:?}: {e}", path))?;

    if buf.len() % 4 != 0 {
        return Err(format!("file {:?} length {} not divisible by 4", path, buf.len()));
    }

    let mut out = Vec::with_capacity(buf.len() / 4);
    for chunk in buf.chunks_exact(4) {
        out.push(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    Ok(out)
}

pub fn read_f32_bin(path: &Path) -> Result<Vec<f32>, String> {
    let mut f = File::open(path).map_err(|e| format!("open {:?}: {e}", path))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf).map_err(|e| format!("read {:?}: {e}", path))?;

    if buf.len() % 4 != 0 {
        return Err(format!("file {:?} length {} not divisible by 4", path, buf.len()));
    }

    let mut out = Vec::with_capacity(buf.len() / 4);
    for chunk in buf.chunks_exact(4) {
        out.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    Ok(out)
}

pub fn write_u32_bin(path: &Path, data: &[u32]) -> Result<(), String> {
    let mut f = File::create(path).map_err(|e| format!("create {:?}: {e}", path))?;

    let mut buf = Vec::with_capacity(data.len() * 4);
    for &x in data {
        buf.extend_from_slice(&x.to_le_bytes());
    }

    f.write_all(&buf).map_err(|e| format!("write {:?}: {e}", path))?;
    Ok(())
}

pub fn write_f32_bin(path: &Path, data: &[f32]) -> Result<(), String> {
    let mut f = File::create(path).map_err(|e| format!("create {:?}: {e}", path))?;

    let mut buf = Vec::with_capacity(data.len() * 4);
    for &x in data {
        buf.extend_from_slice(&x.to_le_bytes());
    }

    f.write_all(&buf).map_err(|e| format!("write {:?}: {e}", path))?;
    Ok(())
}

pub fn load_csr_from_dir(dir: impl AsRef<Path>) -> Result<CsrGraph, String> {
    let dir = dir.as_ref();

    let offset_path = dir.join("csr_offsets_u32.bin");
    let dst_path = dir.join("csr_dst_u32.bin");
    let weight_path = dir.join("csr_weights_f32.bin");

    let offsets = read_u32_bin(&offset_path)?;
    let dst = read_u32_bin(&dst_path)?;
    let w = read_f32_bin(&weight_path)?;

    Ok(CsrGraph { offsets, dst, w })
}

pub fn save_csr_to_dir(g: &CsrGraph, dir: impl AsRef<Path>) -> Result<(), String> {
    let dir = dir.as_ref();

    write_u32_bin(&dir.join("csr_offsets_u32.bin"), &g.offsets)?;
    write_u32_bin(&dir.join("csr_dst_u32.bin"), &g.dst)?;
    write_f32_bin(&dir.join("csr_weights_f32.bin"), &g.w)?;
    Ok(())
}
