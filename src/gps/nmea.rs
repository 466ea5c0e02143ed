// src/gps/nmea.rs
//! NMEA sentence parsing

use super::data::GpsData;

const KNOTS_TO_MPS: f64 = 0.514444;

/// Kind of sentence that was applied to the parse state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentence {
    Gga,
    Rmc,
    Ignored,
}

/// Parse a single NMEA sentence and update GPS data
pub fn parse_nmea_sentence(data: &mut GpsData, line: &str) -> Sentence {
    let parts: Vec<&str> = line.split(',').collect();

    if line.starts_with("$GPGGA") || line.starts_with("$GNGGA") {
        parse_gga(data, &parts);
        Sentence::Gga
    } else if line.starts_with("$GPRMC") || line.starts_with("$GNRMC") {
        parse_rmc(data, &parts);
        Sentence::Rmc
    } else {
        Sentence::Ignored
    }
}

/// `ddmm.mmmm` plus hemisphere to signed decimal degrees
fn parse_coordinate(value: &str, hemisphere: &str, negative: &str) -> Option<f64> {
    if value.is_empty() || hemisphere.is_empty() {
        return None;
    }
    let raw = value.parse::<f64>().ok()?;
    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    let decimal = degrees + minutes / 60.0;
    Some(if hemisphere == negative { -decimal } else { decimal })
}

/// Parse GGA (Global Positioning System Fix Data) sentence
fn parse_gga(data: &mut GpsData, parts: &[&str]) {
    if parts.len() < 15 {
        return;
    }

    // Latitude (field 2 and 3)
    if let Some(latitude) = parse_coordinate(parts[2], parts[3], "S") {
        data.latitude = Some(latitude);
    }

    // Longitude (field 4 and 5)
    if let Some(longitude) = parse_coordinate(parts[4], parts[5], "W") {
        data.longitude = Some(longitude);
    }

    // Fix quality (field 6)
    if let Ok(quality) = parts[6].parse::<u8>() {
        data.fix_quality = Some(quality);
    }

    // Number of satellites (field 7)
    if let Ok(sats) = parts[7].parse::<u8>() {
        data.satellites = Some(sats);
    }

    // HDOP (field 8)
    if let Ok(hdop) = parts[8].parse::<f64>() {
        data.hdop = Some(hdop);
    }

    // Altitude (field 9)
    if let Ok(alt) = parts[9].parse::<f64>() {
        data.altitude = Some(alt);
    }
}

/// Parse RMC (Recommended Minimum Course) sentence
fn parse_rmc(data: &mut GpsData, parts: &[&str]) {
    if parts.len() < 10 {
        return;
    }

    // Status (field 2): V means the receiver has no valid fix
    if parts[2] == "V" {
        data.speed = None;
        return;
    }

    if let Some(latitude) = parse_coordinate(parts[3], parts[4], "S") {
        data.latitude = Some(latitude);
    }

    if let Some(longitude) = parse_coordinate(parts[5], parts[6], "W") {
        data.longitude = Some(longitude);
    }

    // Speed over ground in knots (field 7)
    if let Ok(speed_knots) = parts[7].parse::<f64>() {
        data.speed = Some(speed_knots * KNOTS_TO_MPS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gga_parsing() {
        let mut data = GpsData::new();
        let gga = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";

        assert_eq!(parse_nmea_sentence(&mut data, gga), Sentence::Gga);

        assert!((data.latitude.unwrap() - 48.1173).abs() < 1e-4);
        assert!((data.longitude.unwrap() - 11.516_667).abs() < 1e-4);
        assert_eq!(data.satellites, Some(8));
        assert_eq!(data.hdop, Some(0.9));
        assert_eq!(data.altitude, Some(545.4));
        assert_eq!(data.fix_quality, Some(1));
        assert!(data.has_fix());

        // no receiver error estimate in NMEA; derived from HDOP
        let fix = data.to_fix().unwrap();
        assert!((fix.accuracy.unwrap() - 4.5).abs() < 1e-9);
        assert_eq!(fix.satellites, Some(8));
    }

    #[test]
    fn test_southern_western_hemispheres() {
        let mut data = GpsData::new();
        let gga = "$GPGGA,123519,3351.000,S,15112.000,W,1,08,0.9,10.0,M,46.9,M,,*47";

        parse_nmea_sentence(&mut data, gga);

        assert!((data.latitude.unwrap() + 33.85).abs() < 1e-9);
        assert!((data.longitude.unwrap() + 151.2).abs() < 1e-9);
    }

    #[test]
    fn test_rmc_parsing() {
        let mut data = GpsData::new();
        let rmc = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";

        assert_eq!(parse_nmea_sentence(&mut data, rmc), Sentence::Rmc);

        // Speed should be converted from knots to m/s
        assert!((data.speed.unwrap() - 11.5235).abs() < 0.001);
        assert!(data.latitude.is_some());
    }

    #[test]
    fn test_rmc_void_status_clears_speed() {
        let mut data = GpsData::new();
        data.speed = Some(4.0);
        let rmc = "$GPRMC,123519,V,,,,,,,230394,,*6A";

        parse_nmea_sentence(&mut data, rmc);

        assert!(data.speed.is_none());
        assert!(data.latitude.is_none());
    }

    #[test]
    fn test_invalid_sentence() {
        let mut data = GpsData::new();
        let invalid = "$INVALID,123,456";

        assert_eq!(parse_nmea_sentence(&mut data, invalid), Sentence::Ignored);

        // Should not crash and should not set any values
        assert!(data.latitude.is_none());
        assert!(data.longitude.is_none());
    }
}
