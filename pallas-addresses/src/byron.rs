use pallas_codec::{
    minicbor::{self, bytes::ByteVec, Decode, Encode},
    utils::OrderPreservingProperties,
};

use pallas_crypto::hash::Hash;

pub type Blake2b224 = Hash<28>;

pub type AddressId = Blake2b224;
pub type StakeholderId = Blake2b224;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Hash)]
pub enum AddrDistr {
    Variant0(StakeholderId),
    Variant1,
}

impl<'b, C> minicbor::Decode<'b, C> for AddrDistr {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.array()?;
        let variant = d.u32()?;

        match variant {
            0 => Ok(AddrDistr::Variant0(d.decode_with(ctx)?)),
            1 => Ok(AddrDistr::Variant1),
            _ => Err(minicbor::decode::Error::message(
                "invalid variant for addrdstr",
            )),
        }
    }
}

impl minicbor::Encode<()> for AddrDistr {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            AddrDistr::Variant0(x) => {
                e.array(2)?;
                e.u32(0)?;
                e.encode(x)?;

                Ok(())
            }
            AddrDistr::Variant1 => {
                e.array(1)?;
                e.u32(1)?;

                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Hash)]
pub enum AddrType {
    PubKey,
    Script,
    Redeem,
    Other(u64),
}

impl<'b, C> minicbor::Decode<'b, C> for AddrType {
    fn decode(
        d: &mut minicbor::Decoder<'b>,
        _ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let variant = d.u64()?;

        match variant {
            0 => Ok(AddrType::PubKey),
            1 => Ok(AddrType::Script),
            2 => Ok(AddrType::Redeem),
            x => Ok(AddrType::Other(x)),
        }
    }
}

impl<C> minicbor::Encode<C> for AddrType {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            AddrType::PubKey => e.u64(0)?,
            AddrType::Script => e.u64(1)?,
            AddrType::Redeem => e.u64(2)?,
            AddrType::Other(x) => e.u64(*x)?,
        };

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Hash)]
pub enum AddrAttrProperty {
    AddrDistr(AddrDistr),
    Bytes(ByteVec),
    Unparsed(u8, ByteVec),
}

impl<'b, C> minicbor::Decode<'b, C> for AddrAttrProperty {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        let key = d.u8()?;

        match key {
            0 => Ok(AddrAttrProperty::AddrDistr(d.decode_with(ctx)?)),
            1 => Ok(AddrAttrProperty::Bytes(d.decode_with(ctx)?)),
            x => Ok(AddrAttrProperty::Unparsed(x, d.decode_with(ctx)?)),
        }
    }
}

impl<C> minicbor::Encode<C> for AddrAttrProperty {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            AddrAttrProperty::AddrDistr(x) => {
                e.u32(0)?;
                e.encode(x)?;

                Ok(())
            }
            AddrAttrProperty::Bytes(x) => {
                e.u32(1)?;
                e.encode(x)?;

                Ok(())
            }
            AddrAttrProperty::Unparsed(a, b) => {
                e.encode(a)?;
                e.encode(b)?;

                Ok(())
            }
        }
    }
}

pub type AddrAttr = OrderPreservingProperties<AddrAttrProperty>;

#[derive(Debug, Encode, Decode, Clone, PartialEq, Eq, PartialOrd, Hash)]
pub struct AddressPayload {
    #[n(0)]
    pub root: AddressId,

    #[n(1)]
    pub attributes: AddrAttr,

    #[n(2)]
    pub addrtype: AddrType,
}

/// CRC-32 (IEEE 802.3 polynomial), the checksum every Byron address frames
/// itself with. No `crc` crate is in this workspace's dependency graph, so
/// it's computed by hand the same bit-reflected way any such table-driven
/// implementation does.
mod crc32 {
    const POLY: u32 = 0xEDB8_8320;

    fn table_entry(mut byte: u32) -> u32 {
        for _ in 0..8 {
            byte = if byte & 1 != 0 {
                (byte >> 1) ^ POLY
            } else {
                byte >> 1
            };
        }
        byte
    }

    pub fn checksum(data: &[u8]) -> u32 {
        let mut crc: u32 = 0xFFFF_FFFF;
        for &byte in data {
            let index = (crc ^ byte as u32) & 0xFF;
            crc = (crc >> 8) ^ table_entry(index);
        }
        !crc
    }
}

/// A full Byron (legacy) address: `[#6.24(bytes .cbor AddressPayload),
/// crc32(bstr)]`, the CDDL structure every Byron/Icarus address uses on
/// the wire, base58-rendered for display.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Hash)]
pub struct ByronAddress {
    payload: AddressPayload,
    payload_cbor: Vec<u8>,
}

impl ByronAddress {
    pub fn new(root: AddressId, attributes: AddrAttr, addrtype: AddrType) -> Self {
        let payload = AddressPayload {
            root,
            attributes,
            addrtype,
        };

        // encoding into a `Vec<u8>` can't fail: its `Write` impl is infallible.
        let payload_cbor = minicbor::to_vec(&payload).expect("encoding AddressPayload into a Vec cannot fail");

        Self {
            payload,
            payload_cbor,
        }
    }

    pub fn payload(&self) -> &AddressPayload {
        &self.payload
    }

    /// Gets a numeric id describing the type of the address. Byron
    /// addresses always carry the `0b1000` nibble.
    pub fn typeid(&self) -> u8 {
        0b1000
    }

    pub fn to_vec(&self) -> Vec<u8> {
        minicbor::to_vec(self).expect("encoding ByronAddress into a Vec cannot fail")
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_vec())
    }

    pub fn to_base58(&self) -> String {
        base58::ToBase58::to_base58(self.to_vec().as_slice())
    }

    pub fn from_base58(s: &str) -> Result<Self, crate::Error> {
        let bytes = base58::FromBase58::from_base58(s).map_err(crate::Error::BadBase58)?;
        minicbor::decode(&bytes).map_err(crate::Error::InvalidByronCbor)
    }
}

impl<'b, C> minicbor::Decode<'b, C> for ByronAddress {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.array()?;
        d.tag()?;
        let payload_cbor = d.bytes()?.to_vec();
        let payload = minicbor::decode_with(payload_cbor.as_slice(), ctx)?;
        let crc = d.u32()?;

        if crc32::checksum(&payload_cbor) != crc {
            return Err(minicbor::decode::Error::message(
                "byron address crc32 mismatch",
            ));
        }

        Ok(ByronAddress {
            payload,
            payload_cbor,
        })
    }
}

impl<C> minicbor::Encode<C> for ByronAddress {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        let crc = crc32::checksum(&self.payload_cbor);

        e.array(2)?;
        e.tag(minicbor::data::Tag::Cbor)?;
        e.bytes(&self.payload_cbor)?;
        e.u32(crc)?;

        Ok(())
    }
}
