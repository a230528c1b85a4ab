//! IPv4 CIDR blocks and sequential subnet allocation.

use super::error::{StackError, StackResult};
use ipnetwork::Ipv4Network;

/// Parse a network block such as `10.0.0.0/16`.
///
/// The prefix is mandatory and the address must be the network address.
pub fn parse_block(s: &str) -> StackResult<Ipv4Network> {
    if !s.contains('/') {
        return Err(StackError::Cidr(format!("'{}' is missing a /prefix", s)));
    }
    let block: Ipv4Network = s
        .parse()
        .map_err(|e| StackError::Cidr(format!("'{}': {}", s, e)))?;
    if block.ip() != block.network() {
        return Err(StackError::Cidr(format!("{} has host bits set", s)));
    }
    Ok(block)
}

/// One past the last address of `block`.
fn end(block: &Ipv4Network) -> u64 {
    u64::from(u32::from(block.network())) + u64::from(block.size())
}

/// Carve consecutive blocks with the given prefixes out of `parent`.
///
/// Each block is aligned to its own size and placed after the previous one.
pub fn allocate(parent: &Ipv4Network, masks: &[u8]) -> StackResult<Vec<Ipv4Network>> {
    let mut cursor = u64::from(u32::from(parent.network()));
    let mut blocks = Vec::with_capacity(masks.len());

    for &mask in masks {
        if mask < parent.prefix() || mask > 32 {
            return Err(StackError::Cidr(format!(
                "/{} subnet cannot be carved from {}",
                mask, parent
            )));
        }
        let size = 1u64 << (32 - u32::from(mask));
        let start = cursor.div_ceil(size) * size;
        if start + size > end(parent) {
            return Err(StackError::Cidr(format!(
                "{} has no room for another /{} subnet",
                parent, mask
            )));
        }
        let addr = u32::try_from(start)
            .map_err(|_| StackError::Cidr(format!("address overflow in {}", parent)))?;
        let block = Ipv4Network::new(addr.into(), mask)
            .map_err(|e| StackError::Cidr(format!("{}: {}", parent, e)))?;
        blocks.push(block);
        cursor = start + size;
    }

    Ok(blocks)
}
