use std::io::{BufReader, BufWriter};

use super::*;

#[test]
fn test_alert() -> Result<()> {
    let tests = vec![
        (
            "Valid Alert",
            vec![0x02, 0x0a],
            Alert {
                alert_level: AlertLevel::Fatal,
                alert_description: AlertDescription::UnexpectedMessage,
            },
        ),
        (
            "Valid Alert Close Notify",
            vec![0x01, 0x00],
            Alert {
                alert_level: AlertLevel::Warning,
                alert_description: AlertDescription::CloseNotify,
            },
        ),
    ];

    for (name, data, wanted) in tests {
        let mut reader = BufReader::new(data.as_slice());
        let a = Alert::unmarshal(&mut reader)?;
        assert_eq!(a, wanted, "{name} unmarshal: got {a}, want {wanted}");

        let mut raw = vec![];
        {
            let mut writer = BufWriter::<&mut Vec<u8>>::new(raw.as_mut());
            a.marshal(&mut writer)?;
        }
        assert_eq!(raw, data, "{name} marshal: got {raw:?}, want {data:?}");
    }

    Ok(())
}

#[test]
fn test_alert_unknown_description() -> Result<()> {
    let data = vec![0x02, 0x7b];
    let mut reader = BufReader::new(data.as_slice());
    let a = Alert::unmarshal(&mut reader)?;
    assert_eq!(a.alert_level, AlertLevel::Fatal);
    assert_eq!(a.alert_description, AlertDescription::Invalid);

    Ok(())
}
