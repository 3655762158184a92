//! `CFF `/`CFF2` — Compact Font Format outlines: INDEX/DICT structures plus the
//! Type-2 charstring interpreter (module `vm`).

use crate::error::{FontError, Result};
use crate::outline::{Contour, Outline};
use crate::stream::Reader;

#[derive(Debug, Clone)]
struct Index<'a> {
    items: Vec<&'a [u8]>,
}

impl<'a> Index<'a> {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn get(&self, i: usize) -> Option<&'a [u8]> {
        self.items.get(i).copied()
    }

    /// Parses a CFF1-style INDEX (16-bit count, 8/16/24/32-bit offsets per `offSize`).
    fn parse(reader: &mut Reader<'a>) -> Result<Index<'a>> {
        let count = reader.read_u16()?;
        if count == 0 {
            return Ok(Index { items: Vec::new() });
        }
        let off_size = reader.read_u8()?;
        let mut offsets = Vec::with_capacity(count as usize + 1);
        for _ in 0..=count {
            offsets.push(read_offset(reader, off_size)?);
        }
        let data_start = reader.position() - 1; // offsets are 1-based from here
        let mut items = Vec::with_capacity(count as usize);
        for w in offsets.windows(2) {
            let start = data_start + w[0] as usize;
            let end = data_start + w[1] as usize;
            let len = end.checked_sub(start).ok_or(FontError::CharstringVM("bad INDEX offset"))?;
            items.push(reader.sub_reader(start, len)?.read_bytes(len)?);
        }
        reader.set_position(data_start + *offsets.last().unwrap() as usize)?;
        Ok(Index { items })
    }

    /// Parses a CFF2-style INDEX (32-bit count, otherwise identical).
    fn parse_cff2(reader: &mut Reader<'a>) -> Result<Index<'a>> {
        let count = reader.read_u32()?;
        if count == 0 {
            return Ok(Index { items: Vec::new() });
        }
        let off_size = reader.read_u8()?;
        let mut offsets = Vec::with_capacity(count as usize + 1);
        for _ in 0..=count {
            offsets.push(read_offset(reader, off_size)?);
        }
        let data_start = reader.position() - 1;
        let mut items = Vec::with_capacity(count as usize);
        for w in offsets.windows(2) {
            let start = data_start + w[0] as usize;
            let end = data_start + w[1] as usize;
            let len = end.checked_sub(start).ok_or(FontError::CharstringVM("bad INDEX offset"))?;
            items.push(reader.sub_reader(start, len)?.read_bytes(len)?);
        }
        reader.set_position(data_start + *offsets.last().unwrap() as usize)?;
        Ok(Index { items })
    }
}

fn read_offset(reader: &mut Reader, off_size: u8) -> Result<u32> {
    match off_size {
        1 => reader.read_u8().map(|v| v as u32),
        2 => reader.read_u16().map(|v| v as u32),
        3 => reader.read_u24(),
        4 => reader.read_u32(),
        _ => Err(FontError::CharstringVM("unsupported INDEX offSize")),
    }
}

/// A parsed DICT: operator (or `12 xx` escape, stored as `1200 + xx`) to operand list.
fn parse_dict(data: &[u8]) -> Vec<(u16, Vec<f64>)> {
    let mut entries = Vec::new();
    let mut operands: Vec<f64> = Vec::new();
    let mut i = 0usize;
    while i < data.len() {
        let b0 = data[i];
        match b0 {
            0..=11 | 13..=21 => {
                entries.push((b0 as u16, std::mem::take(&mut operands)));
                i += 1;
            }
            12 => {
                let b1 = data.get(i + 1).copied().unwrap_or(0);
                entries.push((1200 + b1 as u16, std::mem::take(&mut operands)));
                i += 2;
            }
            28 => {
                let v = i16::from_be_bytes([data[i + 1], data[i + 2]]);
                operands.push(v as f64);
                i += 3;
            }
            29 => {
                let v = i32::from_be_bytes([data[i + 1], data[i + 2], data[i + 3], data[i + 4]]);
                operands.push(v as f64);
                i += 5;
            }
            30 => {
                // real number, nibble-encoded
                let mut s = String::new();
                i += 1;
                'outer: while i < data.len() {
                    let byte = data[i];
                    i += 1;
                    for nibble in [byte >> 4, byte & 0xF] {
                        match nibble {
                            0..=9 => s.push((b'0' + nibble) as char),
                            0xa => s.push('.'),
                            0xb => s.push('E'),
                            0xc => s.push_str("E-"),
                            0xe => s.push('-'),
                            0xf => break 'outer,
                            _ => {}
                        }
                    }
                }
                operands.push(s.parse().unwrap_or(0.0));
            }
            32..=246 => {
                operands.push(b0 as f64 - 139.0);
                i += 1;
            }
            247..=250 => {
                let b1 = data.get(i + 1).copied().unwrap_or(0);
                operands.push((b0 as f64 - 247.0) * 256.0 + b1 as f64 + 108.0);
                i += 2;
            }
            251..=254 => {
                let b1 = data.get(i + 1).copied().unwrap_or(0);
                operands.push(-(b0 as f64 - 251.0) * 256.0 - b1 as f64 - 108.0);
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }
    entries
}

fn dict_int(entries: &[(u16, Vec<f64>)], op: u16) -> Option<i64> {
    entries
        .iter()
        .find(|(o, _)| *o == op)
        .and_then(|(_, v)| v.first())
        .map(|v| *v as i64)
}

fn dict_pair(entries: &[(u16, Vec<f64>)], op: u16) -> Option<(i64, i64)> {
    entries
        .iter()
        .find(|(o, _)| *o == op)
        .map(|(_, v)| (v[0] as i64, v.get(1).copied().unwrap_or(0.0) as i64))
}

const OP_CHARSTRINGS: u16 = 17;
const OP_PRIVATE: u16 = 18;
const OP_SUBRS: u16 = 19;
/// `12 36`: FDArray (CFF2 / CID-keyed CFF).
const OP_FDARRAY: u16 = 1236;

#[derive(Debug, Clone, Copy)]
pub enum CffVersion {
    Cff1,
    Cff2,
}

/// A parsed `CFF `/`CFF2` table: enough structure to interpret any glyph's charstring.
#[derive(Debug, Clone)]
pub struct CffTable<'a> {
    version: CffVersion,
    char_strings: Index<'a>,
    global_subrs: Index<'a>,
    local_subrs: Index<'a>,
}

impl<'a> CffTable<'a> {
    pub fn parse(data: &'a [u8], tag: &str) -> Result<Self> {
        let mut reader = Reader::new(data);
        let major = reader.read_u8()?;
        let _minor = reader.read_u8()?;
        let header_size = reader.read_u8()?;

        if tag == "CFF2" || major == 2 {
            reader.set_position(header_size as usize)?;
            let _top_dict_length = reader.read_u16()?;
            let top_dict_len = _top_dict_length as usize;
            let top_dict_data = reader.read_bytes(top_dict_len)?;
            let top_dict = parse_dict(top_dict_data);

            let global_subrs = Index::parse_cff2(&mut reader)?;

            let char_strings_off = dict_int(&top_dict, OP_CHARSTRINGS)
                .ok_or(FontError::CharstringVM("CFF2 top dict missing CharStrings"))?;
            let mut cs_reader = Reader::new(data);
            cs_reader.set_position(char_strings_off as usize)?;
            let char_strings = Index::parse_cff2(&mut cs_reader)?;

            // Scoping decision: use the first Font DICT's Private/local subrs for every
            // glyph rather than resolving FDSelect per glyph id (see DESIGN.md).
            let mut local_subrs = Index { items: Vec::new() };
            if let Some(fdarray_off) = dict_int(&top_dict, OP_FDARRAY) {
                let mut fd_reader = Reader::new(data);
                fd_reader.set_position(fdarray_off as usize)?;
                let fdarray = Index::parse_cff2(&mut fd_reader)?;
                if let Some(fd0) = fdarray.get(0) {
                    let fd_dict = parse_dict(fd0);
                    if let Some((size, offset)) = dict_pair(&fd_dict, OP_PRIVATE) {
                        local_subrs = read_local_subrs(data, size, offset)?;
                    }
                }
            }

            return Ok(CffTable {
                version: CffVersion::Cff2,
                char_strings,
                global_subrs,
                local_subrs,
            });
        }

        reader.set_position(header_size as usize)?;
        let _name_index = Index::parse(&mut reader)?;
        let top_dict_index = Index::parse(&mut reader)?;
        let _string_index = Index::parse(&mut reader)?;
        let global_subrs = Index::parse(&mut reader)?;

        let top_dict_data = top_dict_index
            .get(0)
            .ok_or(FontError::CharstringVM("CFF has no top dict"))?;
        let top_dict = parse_dict(top_dict_data);

        let char_strings_off = dict_int(&top_dict, OP_CHARSTRINGS)
            .ok_or(FontError::CharstringVM("CFF top dict missing CharStrings"))?;
        let mut cs_reader = Reader::new(data);
        cs_reader.set_position(char_strings_off as usize)?;
        let char_strings = Index::parse(&mut cs_reader)?;

        let mut local_subrs = Index { items: Vec::new() };
        if let Some((size, offset)) = dict_pair(&top_dict, OP_PRIVATE) {
            let priv_data = Reader::new(data).sub_reader(offset as usize, size as usize)?.read_bytes(size as usize)?;
            let priv_dict = parse_dict(priv_data);
            if let Some(subrs_off) = dict_int(&priv_dict, OP_SUBRS) {
                let mut subr_reader = Reader::new(data);
                subr_reader.set_position(offset as usize + subrs_off as usize)?;
                local_subrs = Index::parse(&mut subr_reader)?;
            }
        }

        Ok(CffTable {
            version: CffVersion::Cff1,
            char_strings,
            global_subrs,
            local_subrs,
        })
    }

    pub fn version(&self) -> CffVersion {
        self.version
    }

    pub fn num_glyphs(&self) -> usize {
        self.char_strings.len()
    }

    pub fn outline(&self, glyph_id: u16) -> Result<Outline> {
        let charstring = self
            .char_strings
            .get(glyph_id as usize)
            .ok_or(FontError::BadGlyphId(glyph_id as u32))?;
        let vm = vm::CharstringVm::new(
            &self.global_subrs,
            &self.local_subrs,
            matches!(self.version, CffVersion::Cff2),
        );
        vm.run(charstring)
    }
}

fn read_local_subrs(data: &[u8], size: i64, offset: i64) -> Result<Index> {
    let priv_data = Reader::new(data)
        .sub_reader(offset as usize, size as usize)?
        .read_bytes(size as usize)?;
    let priv_dict = parse_dict(priv_data);
    if let Some(subrs_off) = dict_int(&priv_dict, OP_SUBRS) {
        let mut subr_reader = Reader::new(data);
        subr_reader.set_position(offset as usize + subrs_off as usize)?;
        return Index::parse_cff2(&mut subr_reader);
    }
    Ok(Index { items: Vec::new() })
}

pub mod vm {
    use super::Index;
    use crate::error::{FontError, Result};
    use crate::outline::{Contour, Outline};

    const MAX_STACK: usize = 48;
    const MAX_SUBR_DEPTH: u32 = 10;

    fn bias(count: usize) -> i32 {
        if count < 1240 {
            107
        } else if count < 33900 {
            1131
        } else {
            32768
        }
    }

    /// Stack-based interpreter for a single Type-2 charstring.
    pub struct CharstringVm<'a> {
        global_subrs: &'a Index<'a>,
        local_subrs: &'a Index<'a>,
        global_bias: i32,
        local_bias: i32,
        /// CFF2 charstrings never carry a width prefix; width always comes from `hmtx`.
        is_cff2: bool,
        stack: Vec<f32>,
        x: f32,
        y: f32,
        num_stems: u32,
        have_width: bool,
        open: bool,
        outline: Outline,
        contour: Contour,
    }

    impl<'a> CharstringVm<'a> {
        pub fn new(
            global_subrs: &'a Index<'a>,
            local_subrs: &'a Index<'a>,
            is_cff2: bool,
        ) -> Self {
            CharstringVm {
                global_bias: bias(global_subrs.len()),
                local_bias: bias(local_subrs.len()),
                global_subrs,
                local_subrs,
                is_cff2,
                stack: Vec::with_capacity(MAX_STACK),
                x: 0.0,
                y: 0.0,
                num_stems: 0,
                have_width: is_cff2,
                open: false,
                outline: Outline::new(),
                contour: Contour::new(),
            }
        }

        pub fn run(mut self, charstring: &[u8]) -> Result<Outline> {
            self.exec(charstring, 0)?;
            self.close_if_open();
            Ok(self.outline)
        }

        fn push(&mut self, v: f32) -> Result<()> {
            if self.stack.len() >= MAX_STACK {
                return Err(FontError::CharstringVM("operand stack overflow"));
            }
            self.stack.push(v);
            Ok(())
        }

        fn close_if_open(&mut self) {
            if self.open {
                self.contour.close();
                self.outline.contours.push(std::mem::take(&mut self.contour));
                self.open = false;
            }
        }

        fn move_to(&mut self, dx: f32, dy: f32) {
            self.close_if_open();
            self.x += dx;
            self.y += dy;
            self.contour = Contour::new();
            self.contour.move_to(self.x, self.y);
            self.open = true;
        }

        fn line_to(&mut self, dx: f32, dy: f32) {
            self.x += dx;
            self.y += dy;
            self.contour.line_to(self.x, self.y);
        }

        fn curve_to(&mut self, dx1: f32, dy1: f32, dx2: f32, dy2: f32, dx3: f32, dy3: f32) {
            let c1x = self.x + dx1;
            let c1y = self.y + dy1;
            let c2x = c1x + dx2;
            let c2y = c1y + dy2;
            self.x = c2x + dx3;
            self.y = c2y + dy3;
            self.contour.cubic_to(c1x, c1y, c2x, c2y, self.x, self.y);
        }

        /// Consumes a leading width operand from the stack the first time a
        /// stack-clearing operator runs, if the argument count is odd/even-plus-one
        /// per the operator's expected arity.
        fn take_width(&mut self, expected_args: usize) {
            if self.have_width || self.is_cff2 {
                return;
            }
            self.have_width = true;
            if self.stack.len() > expected_args {
                self.stack.remove(0);
            }
        }

        fn exec(&mut self, code: &[u8], depth: u32) -> Result<()> {
            if depth > MAX_SUBR_DEPTH {
                return Err(FontError::CharstringVM("subroutine depth exceeded"));
            }
            let mut i = 0usize;
            while i < code.len() {
                let b0 = code[i];
                match b0 {
                    1 | 3 | 18 | 23 => {
                        // hstem, vstem, hstemhm, vstemhm
                        if !self.have_width && self.stack.len() % 2 == 1 {
                            self.have_width = true;
                            self.stack.remove(0);
                        } else {
                            self.have_width = true;
                        }
                        self.num_stems += self.stack.len() as u32 / 2;
                        self.stack.clear();
                        i += 1;
                    }
                    19 | 20 => {
                        // hintmask, cntrmask: any operands still on the stack are an
                        // implicit final vstem before the mask bytes.
                        if !self.have_width && self.stack.len() % 2 == 1 {
                            self.have_width = true;
                            self.stack.remove(0);
                        } else {
                            self.have_width = true;
                        }
                        self.num_stems += self.stack.len() as u32 / 2;
                        self.stack.clear();
                        let mask_bytes = (self.num_stems as usize).div_ceil(8);
                        i += 1 + mask_bytes;
                    }
                    21 => {
                        // rmoveto
                        self.take_width(2);
                        let dy = self.stack.pop().unwrap_or(0.0);
                        let dx = self.stack.pop().unwrap_or(0.0);
                        self.move_to(dx, dy);
                        self.stack.clear();
                        i += 1;
                    }
                    22 => {
                        // hmoveto
                        self.take_width(1);
                        let dx = self.stack.pop().unwrap_or(0.0);
                        self.move_to(dx, 0.0);
                        self.stack.clear();
                        i += 1;
                    }
                    4 => {
                        // vmoveto
                        self.take_width(1);
                        let dy = self.stack.pop().unwrap_or(0.0);
                        self.move_to(0.0, dy);
                        self.stack.clear();
                        i += 1;
                    }
                    5 => {
                        // rlineto
                        let args = std::mem::take(&mut self.stack);
                        for pair in args.chunks(2) {
                            if pair.len() == 2 {
                                self.line_to(pair[0], pair[1]);
                            }
                        }
                        i += 1;
                    }
                    6 | 7 => {
                        // hlineto / vlineto, alternating axis
                        let args = std::mem::take(&mut self.stack);
                        let mut horizontal = b0 == 6;
                        for &v in &args {
                            if horizontal {
                                self.line_to(v, 0.0);
                            } else {
                                self.line_to(0.0, v);
                            }
                            horizontal = !horizontal;
                        }
                        i += 1;
                    }
                    8 => {
                        // rrcurveto
                        let args = std::mem::take(&mut self.stack);
                        for c in args.chunks(6) {
                            if c.len() == 6 {
                                self.curve_to(c[0], c[1], c[2], c[3], c[4], c[5]);
                            }
                        }
                        i += 1;
                    }
                    24 => {
                        // rcurveline: curves then one final line
                        let args = std::mem::take(&mut self.stack);
                        let curve_len = args.len().saturating_sub(2);
                        let curve_len = curve_len - curve_len % 6;
                        for c in args[..curve_len].chunks(6) {
                            self.curve_to(c[0], c[1], c[2], c[3], c[4], c[5]);
                        }
                        if args.len() >= curve_len + 2 {
                            self.line_to(args[curve_len], args[curve_len + 1]);
                        }
                        i += 1;
                    }
                    25 => {
                        // rlinecurve: lines then one final curve
                        let args = std::mem::take(&mut self.stack);
                        let line_len = args.len().saturating_sub(6);
                        let line_len = line_len - line_len % 2;
                        for pair in args[..line_len].chunks(2) {
                            self.line_to(pair[0], pair[1]);
                        }
                        if args.len() >= line_len + 6 {
                            let c = &args[line_len..line_len + 6];
                            self.curve_to(c[0], c[1], c[2], c[3], c[4], c[5]);
                        }
                        i += 1;
                    }
                    26 => {
                        // vvcurveto: optional leading dx1, then vertical-start curves
                        let mut args = std::mem::take(&mut self.stack);
                        let mut dx1 = 0.0;
                        if args.len() % 4 == 1 {
                            dx1 = args.remove(0);
                        }
                        let mut first = true;
                        for c in args.chunks(4) {
                            if c.len() == 4 {
                                let dx = if first { dx1 } else { 0.0 };
                                self.curve_to(dx, c[0], c[1], c[2], 0.0, c[3]);
                                first = false;
                            }
                        }
                        i += 1;
                    }
                    27 => {
                        // hhcurveto: optional leading dy1, then horizontal-start curves
                        let mut args = std::mem::take(&mut self.stack);
                        let mut dy1 = 0.0;
                        if args.len() % 4 == 1 {
                            dy1 = args.remove(0);
                        }
                        let mut first = true;
                        for c in args.chunks(4) {
                            if c.len() == 4 {
                                let dy = if first { dy1 } else { 0.0 };
                                self.curve_to(c[0], dy, c[1], c[2], c[3], 0.0);
                                first = false;
                            }
                        }
                        i += 1;
                    }
                    30 | 31 => {
                        // vhcurveto / hvcurveto: alternating start tangent
                        let args = std::mem::take(&mut self.stack);
                        let mut horizontal = b0 == 31;
                        let mut idx = 0usize;
                        while idx + 4 <= args.len() {
                            let has_extra = idx + 5 == args.len();
                            let c = &args[idx..idx + 4];
                            let dlast = if has_extra { args[idx + 4] } else { 0.0 };
                            if horizontal {
                                self.curve_to(c[0], 0.0, c[1], c[2], dlast, c[3]);
                            } else {
                                self.curve_to(0.0, c[0], c[1], c[2], c[3], dlast);
                            }
                            horizontal = !horizontal;
                            idx += 4;
                        }
                        i += 1;
                    }
                    10 => {
                        // callsubr
                        let idx = self.stack.pop().unwrap_or(0.0) as i32 + self.local_bias;
                        if let Some(code) = self.local_subrs.get(idx.max(0) as usize) {
                            self.exec(code, depth + 1)?;
                        }
                        i += 1;
                    }
                    29 => {
                        // callgsubr
                        let idx = self.stack.pop().unwrap_or(0.0) as i32 + self.global_bias;
                        if let Some(code) = self.global_subrs.get(idx.max(0) as usize) {
                            self.exec(code, depth + 1)?;
                        }
                        i += 1;
                    }
                    11 => return Ok(()), // return
                    14 => {
                        // endchar
                        self.take_width(0);
                        self.close_if_open();
                        self.stack.clear();
                        return Ok(());
                    }
                    12 => {
                        let b1 = *code.get(i + 1).ok_or(FontError::CharstringVM("truncated escape op"))?;
                        self.exec_escape(b1)?;
                        i += 2;
                    }
                    28 => {
                        let hi = *code.get(i + 1).unwrap_or(&0);
                        let lo = *code.get(i + 2).unwrap_or(&0);
                        self.push(i16::from_be_bytes([hi, lo]) as f32)?;
                        i += 3;
                    }
                    32..=246 => {
                        self.push(b0 as f32 - 139.0)?;
                        i += 1;
                    }
                    247..=250 => {
                        let b1 = *code.get(i + 1).unwrap_or(&0);
                        self.push((b0 as f32 - 247.0) * 256.0 + b1 as f32 + 108.0)?;
                        i += 2;
                    }
                    251..=254 => {
                        let b1 = *code.get(i + 1).unwrap_or(&0);
                        self.push(-(b0 as f32 - 251.0) * 256.0 - b1 as f32 - 108.0)?;
                        i += 2;
                    }
                    255 => {
                        let b = [
                            *code.get(i + 1).unwrap_or(&0),
                            *code.get(i + 2).unwrap_or(&0),
                            *code.get(i + 3).unwrap_or(&0),
                            *code.get(i + 4).unwrap_or(&0),
                        ];
                        let v = i32::from_be_bytes(b) as f32 / 65536.0;
                        self.push(v)?;
                        i += 5;
                    }
                    _ => return Err(FontError::UnsupportedOp(b0)),
                }
            }
            Ok(())
        }

        /// `12 xx` escape operators: flex variants plus CFF2 `blend` (consumed, zero deltas).
        fn exec_escape(&mut self, op: u8) -> Result<()> {
            match op {
                35 => {
                    // flex: 13 args, two curves, last arg is flex depth (ignored)
                    let args = std::mem::take(&mut self.stack);
                    if args.len() >= 12 {
                        self.curve_to(args[0], args[1], args[2], args[3], args[4], args[5]);
                        self.curve_to(args[6], args[7], args[8], args[9], args[10], args[11]);
                    }
                }
                34 => {
                    // hflex: 7 args, both curves horizontal-biased
                    let a = std::mem::take(&mut self.stack);
                    if a.len() >= 7 {
                        let y0 = self.y;
                        self.curve_to(a[0], 0.0, a[1], a[2], a[3], 0.0);
                        let dy_back = y0 - self.y;
                        self.curve_to(a[4], 0.0, a[5], dy_back, a[6], 0.0);
                    }
                }
                36 => {
                    // hflex1: 9 args
                    let a = std::mem::take(&mut self.stack);
                    if a.len() >= 9 {
                        let y0 = self.y;
                        self.curve_to(a[0], a[1], a[2], a[3], a[4], 0.0);
                        let dy_back = y0 - self.y - a[7];
                        self.curve_to(a[5], 0.0, a[6], a[7], a[8], dy_back);
                    }
                }
                37 => {
                    // flex1: 11 args; last arg is dx or dy depending on accumulated delta
                    let a = std::mem::take(&mut self.stack);
                    if a.len() >= 11 {
                        let (x0, y0) = (self.x, self.y);
                        self.curve_to(a[0], a[1], a[2], a[3], a[4], a[5]);
                        let dx_sum = a[0] + a[2] + a[4] + a[6] + a[8];
                        let dy_sum = a[1] + a[3] + a[5] + a[7] + a[9];
                        if dx_sum.abs() > dy_sum.abs() {
                            self.curve_to(a[6], a[7], a[8], a[9], a[10], y0 - self.y - a[7] - a[9]);
                        } else {
                            self.curve_to(a[6], a[7], a[8], a[9], x0 - self.x - a[6] - a[8], a[10]);
                        }
                    }
                }
                // CFF2 blend/vsindex: consumed but not evaluated (no variation data is
                // applied), see the resolved Open Question in the grounding ledger.
                16 | 15 => {
                    self.stack.clear();
                }
                _ => return Err(FontError::UnsupportedOp(op)),
            }
            Ok(())
        }
    }
}
