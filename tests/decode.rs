//! End-to-end decoding of the sample report through every container.
use std::fs::File;
use std::io::{Cursor, Write};

use anyhow::Result;
use chrono::DateTime;
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::tempdir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use dmarc_report::models::{
    AuthResults, DateRange, DkimAuthResult, Identifiers, Metadata, PolicyEvaluated,
    PolicyPublished, Row, SpfAuthResult,
};
use dmarc_report::{
    check, check_file, check_gzip, check_zip, decode, decode_file, decode_gzip, decode_zip,
    Config, ContainerError, Decoder, DmarcError,
};

const REPORT: &str = include_str!("data/test_report.xml");

const EXPECTED_FAILURE: &str = "Some record failed:
\t* Failure for source IP 10.1.1.2:
\t\t* DKIM is not aligned
\t\t* SPF is not aligned
\t\t* DKIM authentication failed
\t\t* SPF authentication failed
";

fn gzipped(data: &[u8]) -> Vec<u8> {
    let mut gz = GzEncoder::new(Vec::new(), Compression::default());
    gz.write_all(data).unwrap();
    gz.finish().unwrap()
}

fn zipped(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

#[test]
fn test_decode() -> Result<()> {
    let agg = decode(REPORT.as_bytes())?;

    assert_eq!(
        agg.metadata,
        Metadata {
            org_name: "Test Inc.".to_string(),
            email: "postmaster@test".to_string(),
            extra_contact_info: "http://test/help".to_string(),
            report_id: "1.id.0".to_string(),
            date_range: DateRange {
                begin: DateTime::from_timestamp(1524182400, 0).unwrap(),
                end: DateTime::from_timestamp(1524268799, 0).unwrap(),
            },
        }
    );
    assert_eq!(
        agg.policy_published,
        PolicyPublished {
            domain: "test.net".to_string(),
            adkim: "r".to_string(),
            aspf: "r".to_string(),
            policy: "none".to_string(),
            subdomain_policy: String::new(),
            percentage: Some(100),
        }
    );

    assert_eq!(agg.records.len(), 2);
    assert_eq!(
        agg.records[0].row,
        Row {
            source_ip: "192.168.1.1".to_string(),
            count: 5,
            policy_evaluated: PolicyEvaluated {
                disposition: "none".to_string(),
                dkim: "pass".to_string(),
                spf: "pass".to_string(),
            },
        }
    );
    assert_eq!(
        agg.records[0].identifiers,
        Identifiers {
            header_from: "test.net".to_string(),
        }
    );
    assert_eq!(
        agg.records[0].auth_results,
        AuthResults {
            dkim: DkimAuthResult {
                domain: "test.net".to_string(),
                result: "pass".to_string(),
                selector: "selector".to_string(),
            },
            spf: SpfAuthResult {
                domain: "test.net".to_string(),
                result: "pass".to_string(),
                scope: "mfrom".to_string(),
            },
        }
    );
    assert_eq!(agg.message_count(), 6);
    Ok(())
}

#[test]
fn test_every_container_yields_the_same_report() -> Result<()> {
    let plain = decode(REPORT.as_bytes())?;
    let from_gzip = decode_gzip(&gzipped(REPORT.as_bytes())[..])?;
    let from_zip = decode_zip(Cursor::new(zipped(&[("report.xml", REPORT.as_bytes())])))?;
    assert_eq!(plain, from_gzip);
    assert_eq!(plain, from_zip);
    Ok(())
}

#[test]
fn test_large_document_decodes_from_every_container() -> Result<()> {
    let start = REPORT.find("<record>").unwrap();
    let end = REPORT.find("</feedback>").unwrap();
    let large = format!(
        "{}{}</feedback>",
        &REPORT[..start],
        REPORT[start..end].repeat(40)
    );
    let decoder = Decoder::new(Config {
        max_file_size: 4096,
        ..Config::default()
    });
    assert!(large.len() > decoder.config().max_file_size);

    let gz = gzipped(large.as_bytes());
    let zip = zipped(&[("report.xml", large.as_bytes())]);
    let plain = decoder.decode(large.as_bytes())?;
    assert_eq!(plain.records.len(), 80);
    assert_eq!(plain, decoder.decode_gzip(&gz[..])?);
    assert_eq!(plain, decoder.decode_zip(Cursor::new(zip.clone()))?);
    assert_eq!(plain, decoder.decode_file("report.xml", large.as_bytes())?);
    assert_eq!(plain, decoder.decode_file("report.xml.gz", &gz[..])?);
    assert_eq!(plain, decoder.decode_file("report.zip", &zip[..])?);
    Ok(())
}

#[test]
fn test_record_validate() -> Result<()> {
    let agg = decode(REPORT.as_bytes())?;
    assert!(agg.records[0].validate().is_ok());
    let failure = agg.records[1].validate().unwrap_err();
    assert_eq!(
        failure.to_string(),
        "Failure for source IP 10.1.1.2:
\t* DKIM is not aligned
\t* SPF is not aligned
\t* DKIM authentication failed
\t* SPF authentication failed
"
    );
    Ok(())
}

#[test]
fn test_aggregate_validate() -> Result<()> {
    let agg = decode(REPORT.as_bytes())?;
    let failure = agg.validate().unwrap_err();
    assert_eq!(failure.to_string(), EXPECTED_FAILURE);
    Ok(())
}

#[test]
fn test_check_wrappers() {
    let gz = gzipped(REPORT.as_bytes());
    let zip = zipped(&[("report.xml", REPORT.as_bytes())]);
    let results = [
        check(REPORT.as_bytes()),
        check_gzip(&gz[..]),
        check_zip(Cursor::new(zip.clone())),
        check_file("report.xml.gz", &gz[..]),
        check_file("report.zip", &zip[..]),
    ];
    for result in results {
        let err = result.unwrap_err();
        assert!(err.is_policy_failure());
        assert_eq!(err.to_string(), EXPECTED_FAILURE);
    }
}

#[test]
fn test_zip_first_xml_entry_wins() -> Result<()> {
    let other = REPORT.replace("1.id.0", "2.id.0");
    let data = zipped(&[
        ("notes.txt", b"not a report"),
        ("first.xml", REPORT.as_bytes()),
        ("second.xml", other.as_bytes()),
    ]);
    for _ in 0..3 {
        let agg = decode_zip(Cursor::new(data.clone()))?;
        assert_eq!(agg.metadata.report_id, "1.id.0");
    }
    Ok(())
}

#[test]
fn test_zip_without_xml_entry() {
    let data = zipped(&[("report.txt", REPORT.as_bytes())]);
    let err = decode_zip(Cursor::new(data)).unwrap_err();
    assert!(matches!(err, DmarcError::NotFound));
}

#[test]
fn test_decode_file_dispatches_on_name() -> Result<()> {
    let gz = gzipped(REPORT.as_bytes());
    let agg = decode_file("report.gz", &gz[..])?;
    assert_eq!(agg.metadata.org_name, "Test Inc.");

    for name in ["report.xml", "report", "report.gzip"] {
        let err = decode_file(name, &gz[..]).unwrap_err();
        assert!(matches!(err, DmarcError::Parse(_)), "{name}: {err:?}");
    }

    let zip = zipped(&[("report.xml", REPORT.as_bytes())]);
    let agg = decode_file("example.com!test.net!1524182400!1524268799.zip", &zip[..])?;
    assert_eq!(agg.records.len(), 2);
    Ok(())
}

#[test]
fn test_pct_absent_versus_zero() -> Result<()> {
    let absent = REPORT.replace("<pct>100</pct>", "");
    let zero = REPORT.replace("<pct>100</pct>", "<pct>0</pct>");
    let empty = REPORT.replace("<pct>100</pct>", "<pct/>");
    assert_eq!(decode(absent.as_bytes())?.policy_published.percentage, None);
    assert_eq!(decode(zero.as_bytes())?.policy_published.percentage, Some(0));
    assert_eq!(decode(empty.as_bytes())?.policy_published.percentage, Some(0));
    Ok(())
}

#[test]
fn test_container_errors() {
    let err = decode_gzip(REPORT.as_bytes()).unwrap_err();
    assert!(matches!(err, DmarcError::Container(ContainerError::Gzip(_))));

    let err = decode_zip(Cursor::new(REPORT.as_bytes().to_vec())).unwrap_err();
    assert!(matches!(err, DmarcError::Container(ContainerError::Zip(_))));
}

#[test]
fn test_inner_parse_error_propagates() {
    let gz = gzipped(b"<feedback><record>");
    assert!(matches!(decode_gzip(&gz[..]), Err(DmarcError::Parse(_))));

    let bad_date = REPORT.replace("<begin>1524182400</begin>", "<begin>2018-04-20</begin>");
    match decode_gzip(&gzipped(bad_date.as_bytes())[..]) {
        Err(DmarcError::MalformedField { field, value }) => {
            assert_eq!(field, "feedback/report_metadata/date_range/begin");
            assert_eq!(value, "2018-04-20");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_decode_path() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("report.xml.gz");
    File::create(&path)?.write_all(&gzipped(REPORT.as_bytes()))?;

    let agg = Decoder::default().decode_path(&path)?;
    assert_eq!(agg.metadata.report_id, "1.id.0");

    let missing = dir.path().join("missing.xml");
    assert!(matches!(Decoder::default().decode_path(&missing), Err(DmarcError::Io(_))));
    Ok(())
}
