pub use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::PathBuf,
};

#[derive(thiserror::Error, Debug)]
pub enum WadError {
    #[error("not a WAD file")]
    NotAWad,
    #[error("lump not found: {0}")]
    LumpNotFound(String),
}

/// WAD directory entry
#[derive(Debug, Clone)]
pub struct Lump {
    pub name: String,   // 8-char upper ASCII without trailing NULs
    pub filepos: u32,   // offset from start of file
    pub size: u32,      // bytes
}

/// Parsed WAD file with a case-insensitive name index.
/// Multiple lumps can share the same name, so the index maps to a list of indices.
#[derive(Debug)]
pub struct Wad {
    file: File,
    lumps: Vec<Lump>,
    index: HashMap<String, Vec<usize>>,
}

impl Wad {
    /// Open and parse an IWAD or PWAD.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut f = File::open(&path).with_context(|| format!("opening {:?}", path))?;

        // Header: ident[4], numlumps[4], infotableofs[4]
        let mut ident = [0u8; 4];
        f.read_exact(&mut ident)?;
        let numlumps = read_u32(&mut f)?;
        let infoofs = read_u32(&mut f)?;

        if &ident != b"IWAD" && &ident != b"PWAD" {
            return Err(WadError::NotAWad.into());
        }

        // Directory: numlumps entries of { filepos[4], size[4], name[8] }
        f.seek(SeekFrom::Start(infoofs as u64))?;
        let mut lumps = Vec::with_capacity(numlumps as usize);
        for _ in 0..numlumps {
            let filepos = read_u32(&mut f)?;
            let size = read_u32(&mut f)?;
            let mut name_bytes = [0u8; 8];
            f.read_exact(&mut name_bytes)?;
            let name = bytes_to_lump_name(&name_bytes);
            lumps.push(Lump { name, filepos, size });
        }

        // Build case-insensitive multi-map
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, l) in lumps.iter().enumerate() {
            index.entry(l.name.clone()).or_default().push(i);
        }

        Ok(Self { file: f, lumps, index })
    }

    /// Number of lumps.
    pub fn len(&self) -> usize {
        self.lumps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lumps.is_empty()
    }

    /// Borrow all directory entries.
    pub fn lumps(&self) -> &[Lump] {
        &self.lumps
    }

    /// List lump names, in file order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.lumps.iter().map(|l| l.name.as_str())
    }

    /// Find all indices for a lump name, case-insensitive.
    pub fn find_all(&self, name: &str) -> Option<&[usize]> {
        self.index.get(&name.to_uppercase()).map(|v| v.as_slice())
    }

    /// True if at least one lump with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_uppercase())
    }

    /// Get the first matching lump directory entry.
    pub fn get_first(&self, name: &str) -> Option<&Lump> {
        self.find_all(name).and_then(|ids| ids.first().map(|&i| &self.lumps[i]))
    }

    /// Return lumps whose name starts with the given ASCII prefix, case-insensitive.
    /// Useful for D_ music lumps or DS sound effects.
    pub fn by_prefix(&self, prefix: &str) -> Vec<&Lump> {
        let p = prefix.to_ascii_uppercase();
        self.lumps
            .iter()
            .filter(|l| l.name.starts_with(&p))
            .collect()
    }

    /// Read lump bytes by index.
    pub fn read_at(&mut self, idx: usize) -> Result<Vec<u8>> {
        let l = self.lumps.get(idx).context("lump index out of range")?;
        self.read_span(l.filepos as u64, l.size as usize)
    }

    /// Read the first lump that matches the given name.
    pub fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        let idx = self.find_all(name)
            .and_then(|v| v.first().copied())
            .ok_or_else(|| WadError::LumpNotFound(name.to_string()))?;
        self.read_at(idx)
    }

    // Zero-alloc iterator variant so we don't need a Vec
    pub fn iter_with_prefixes<'a>(&'a self, prefixes: &[&str]) 
        -> impl Iterator<Item = &'a Lump> + 'a 
    {
        let ups: Vec<String> = prefixes.iter().map(|p| p.to_ascii_uppercase()).collect();
        self.lumps.iter().filter(move |l| ups.iter().any(|p| l.name.starts_with(p)))
    }

    /// List lumps by a set of prefixes (e.g. ["D_", "MUS_"]).
    pub fn list_with_prefixes<'a>(&'a self, prefixes: &[&str]) -> Vec<&'a Lump> {
        let ups: Vec<String> = prefixes.iter().map(|p| p.to_ascii_uppercase()).collect();
        self.lumps
            .iter()
            .filter(|l| ups.iter().any(|p| l.name.starts_with(p)))
            .collect()
    }

    /// Raw file span read
    fn read_span(&mut self, start: u64, len: usize) -> Result<Vec<u8>> {
        self.file.seek(SeekFrom::Start(start))?;
        let mut buf = vec![0u8; len];
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// Minimal helper for a one-off function call.
/// Uses the Wad type under the hood.
pub fn read_lump(path: &str, name: &str) -> Result<Vec<u8>> {
    let mut wad = Wad::open(path)?;
    wad.read(name)
}

/// Convert an 8-byte WAD name to upper ASCII without trailing NULs.
fn bytes_to_lump_name(b: &[u8; 8]) -> String {
    // Doom lump names are ASCII upper. Normalize to upper for case-insensitive lookups.
    let s = b.split(|&c| c == 0).next().unwrap_or(b);
    String::from_utf8_lossy(s).to_uppercase()
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(u32::from_le_bytes(b))
}
