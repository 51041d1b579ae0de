use bincode::{Decode, Encode};

use crate::{block::FixedList, error::Result};

/// Turns a block into bytes for the backing file and back
pub trait Serializer<T>
{
    fn serialize(&self, block: &FixedList<T>) -> Result<Vec<u8>>;

    fn deserialize(&self, bytes: &[u8]) -> Result<FixedList<T>>;
}

/// Encodes `(capacity, items)` with the standard bincode configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeSerializer;

impl<T: Encode + Decode + 'static> Serializer<T> for BincodeSerializer
{
    fn serialize(&self, block: &FixedList<T>) -> Result<Vec<u8>>
    {
        let config = bincode::config::standard();
        Ok(bincode::encode_to_vec(
            (block.capacity() as u64, block.as_slice()),
            config,
        )?)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<FixedList<T>>
    {
        let config = bincode::config::standard();
        let ((capacity, items), _): ((u64, Vec<T>), usize) = bincode::decode_from_slice(bytes, config)?;
        FixedList::from_vec(items, capacity as usize)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_capacity_survives()
    {
        let block = FixedList::from_vec(vec![String::from("ab"), String::from("c")], 7).unwrap();
        let bytes = BincodeSerializer.serialize(&block).unwrap();
        let back: FixedList<String> = BincodeSerializer.deserialize(&bytes).unwrap();
        assert_eq!(back, block);
        assert_eq!(back.capacity(), 7);
    }

    #[test]
    fn test_truncated_input_is_an_error()
    {
        let block = FixedList::from_vec((0..100_u32).collect(), 128).unwrap();
        let bytes = BincodeSerializer.serialize(&block).unwrap();
        let result: Result<FixedList<u32>> = BincodeSerializer.deserialize(&bytes[..bytes.len() / 2]);
        assert!(result.is_err());
    }
}
