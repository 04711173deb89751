//! Bit streams over byte channels
//!
//! `BitReader` and `BitWriter` move single bits, bytes, and words through an
//! ordinary `Read` or `Write` object.  Bits are packed MSB first.  Neither side
//! holds more than one byte, so the channel should usually be wrapped in a
//! `BufReader` or `BufWriter` by the caller.

use std::io::{Read,Write,Bytes};
use bit_vec::BitVec;
use num_traits::{PrimInt,Unsigned};
use crate::Error;

/// Number of bits in an unsigned integer type
fn width<T: PrimInt + Unsigned>() -> u32 {
    T::zero().count_zeros()
}

pub struct BitReader<R: Read> {
    bytes: Bytes<R>,
    /// last byte pulled from the channel
    buffer: u8,
    /// bits of `buffer` not yet handed out
    avail: u8,
    count: u64
}

impl <R: Read> BitReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            bytes: reader.bytes(),
            buffer: 0,
            avail: 0,
            count: 0
        }
    }
    fn refill(&mut self) -> Result<(),Error> {
        match self.bytes.next() {
            Some(Ok(by)) => {
                self.buffer = by;
                self.avail = 8;
                self.count += 1;
                Ok(())
            },
            Some(Err(e)) => Err(Error::Io(e)),
            None => Err(Error::EndOfStream)
        }
    }
    /// Get the next bit, reading from the channel as needed.
    /// There is no zero fill, running out is `EndOfStream`.
    pub fn get_bit(&mut self) -> Result<bool,Error> {
        if self.avail == 0 {
            self.refill()?;
        }
        self.avail -= 1;
        Ok((self.buffer >> self.avail) & 1 > 0)
    }
    /// get as many bits as there are in `T`, first bit read is the MSB
    pub fn get_bits<T: PrimInt + Unsigned>(&mut self) -> Result<T,Error> {
        let mut ans = T::zero();
        for _i in 0..width::<T>() {
            ans = ans << 1usize;
            if self.get_bit()? {
                ans = ans | T::one();
            }
        }
        Ok(ans)
    }
    pub fn get_byte(&mut self) -> Result<u8,Error> {
        self.get_bits::<u8>()
    }
    pub fn get_word(&mut self) -> Result<u32,Error> {
        self.get_bits::<u32>()
    }
    /// bytes consumed from the channel so far
    pub fn bytes_read(&self) -> u64 {
        self.count
    }
}

/// Packs bits into bytes and writes each byte as soon as it fills.
/// Dropping the writer closes it, but errors can only be seen by calling `close`.
pub struct BitWriter<W: Write> {
    writer: W,
    buffer: u8,
    /// number of bits pending in `buffer`
    pending: u8,
    count: u64
}

impl <W: Write> BitWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buffer: 0,
            pending: 0,
            count: 0
        }
    }
    fn flush_buffer(&mut self) -> Result<(),Error> {
        if self.pending == 0 {
            return Ok(());
        }
        // pad on the right with zeros
        self.buffer <<= 8 - self.pending;
        self.writer.write_all(&[self.buffer])?;
        self.count += 1;
        self.buffer = 0;
        self.pending = 0;
        Ok(())
    }
    pub fn put_bit(&mut self,bit: bool) -> Result<(),Error> {
        self.buffer <<= 1;
        if bit {
            self.buffer |= 1;
        }
        self.pending += 1;
        if self.pending == 8 {
            self.flush_buffer()?;
        }
        Ok(())
    }
    /// put all the bits in `val`, starting from the MSB
    pub fn put_bits<T: PrimInt + Unsigned>(&mut self,val: T) -> Result<(),Error> {
        let msb = width::<T>() as usize - 1;
        for i in (0..=msb).rev() {
            self.put_bit((val >> i) & T::one() == T::one())?;
        }
        Ok(())
    }
    pub fn put_byte(&mut self,by: u8) -> Result<(),Error> {
        self.put_bits(by)
    }
    pub fn put_word(&mut self,word: u32) -> Result<(),Error> {
        self.put_bits(word)
    }
    /// output every bit of `code` in order
    pub fn put_code(&mut self,code: &BitVec) -> Result<(),Error> {
        for bit in code.iter() {
            self.put_bit(bit)?;
        }
        Ok(())
    }
    /// Write out any partial byte, zero padded.  Calling again does nothing.
    /// The underlying channel is not flushed.
    pub fn close(&mut self) -> Result<(),Error> {
        self.flush_buffer()
    }
    /// bytes written to the channel so far
    pub fn bytes_written(&self) -> u64 {
        self.count
    }
}

impl <W: Write> Drop for BitWriter<W> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("bits lost closing stream: {}",e);
        }
    }
}

#[cfg(test)]
use std::io::Cursor;

#[test]
fn mixed_reads() {
    let dat: [u8;8] = [0x58,0x90,0xab,0x08,0x00,0x4e,0xdb,0x40];
    let mut bits = BitReader::new(Cursor::new(dat));
    assert_eq!(bits.get_bit().unwrap(),false);
    assert_eq!(bits.get_bit().unwrap(),true);
    assert_eq!(bits.get_byte().unwrap(),0x62);
    assert_eq!(bits.get_byte().unwrap(),0x42);
    assert_eq!(bits.get_bit().unwrap(),true);
    assert_eq!(bits.get_word().unwrap(),0x58400276);
    assert_eq!(bits.bytes_read(),7);
}

#[test]
fn read_past_end() {
    let dat: [u8;8] = [0x58,0x90,0xab,0x08,0x00,0x4e,0xdb,0x40];
    let mut bits = BitReader::new(Cursor::new(dat));
    assert_eq!(bits.get_word().unwrap(),0x5890ab08);
    assert_eq!(bits.get_bit().unwrap(),false);
    assert_eq!(bits.get_byte().unwrap(),0);
    // only 23 bits are left
    assert!(matches!(bits.get_word(),Err(Error::EndOfStream)));

    let mut bits = BitReader::new(Cursor::new(Vec::<u8>::new()));
    assert!(matches!(bits.get_bit(),Err(Error::EndOfStream)));
}

#[test]
fn writes_with_padding() {
    let mut ans: Vec<u8> = Vec::new();
    let mut bits = BitWriter::new(&mut ans);
    bits.put_byte(0x55).unwrap();
    bits.put_byte(0x27).unwrap();
    bits.put_word(0x55555555).unwrap();
    bits.put_bit(true).unwrap();
    assert_eq!(bits.bytes_written(),6);
    bits.close().unwrap();
    bits.close().unwrap();
    assert_eq!(bits.bytes_written(),7);
    drop(bits);
    assert_eq!(ans,vec![0x55,0x27,0x55,0x55,0x55,0x55,0x80]);
}

#[test]
fn drop_closes() {
    let mut ans: Vec<u8> = Vec::new();
    {
        let mut bits = BitWriter::new(&mut ans);
        bits.put_bit(true).unwrap();
        bits.put_bit(true).unwrap();
        bits.put_bit(false).unwrap();
        bits.put_bit(true).unwrap();
    }
    assert_eq!(ans,vec![0xd0]);
}

#[test]
fn codes_and_words_come_back() {
    let mut code = BitVec::new();
    for b in [true,false,true,true,false] {
        code.push(b);
    }
    let mut buf: Vec<u8> = Vec::new();
    {
        let mut bits = BitWriter::new(&mut buf);
        bits.put_bit(true).unwrap();
        bits.put_code(&code).unwrap();
        bits.put_word(0xdeadbeef).unwrap();
        bits.put_byte(0x81).unwrap();
        bits.put_code(&code).unwrap();
        bits.close().unwrap();
    }
    // 1 + 5 + 32 + 8 + 5 = 51 bits
    assert_eq!(buf.len(),7);
    let mut bits = BitReader::new(Cursor::new(buf));
    assert_eq!(bits.get_bit().unwrap(),true);
    for b in code.iter() {
        assert_eq!(bits.get_bit().unwrap(),b);
    }
    assert_eq!(bits.get_word().unwrap(),0xdeadbeef);
    assert_eq!(bits.get_byte().unwrap(),0x81);
    for b in code.iter() {
        assert_eq!(bits.get_bit().unwrap(),b);
    }
    // padding is readable, then the channel runs dry
    for _i in 0..5 {
        assert_eq!(bits.get_bit().unwrap(),false);
    }
    assert!(matches!(bits.get_bit(),Err(Error::EndOfStream)));
}
