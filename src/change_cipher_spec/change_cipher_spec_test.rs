use std::io::{BufReader, BufWriter};

use super::*;

#[test]
fn test_change_cipher_spec_round_trip() -> Result<()> {
    let c = ChangeCipherSpec {};
    let mut raw = vec![];
    {
        let mut writer = BufWriter::<&mut Vec<u8>>::new(raw.as_mut());
        c.marshal(&mut writer)?;
    }
    assert_eq!(raw, vec![0x01]);

    let mut reader = BufReader::new(raw.as_slice());
    let cnew = ChangeCipherSpec::unmarshal(&mut reader)?;
    assert_eq!(cnew, c);

    Ok(())
}

#[test]
fn test_change_cipher_spec_invalid() {
    let data = vec![0x00];
    let mut reader = BufReader::new(data.as_slice());
    let result = ChangeCipherSpec::unmarshal(&mut reader);
    assert_eq!(result, Err(Error::ErrInvalidCipherSpec));
}
