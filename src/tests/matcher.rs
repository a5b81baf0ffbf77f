use crate::matcher::{Catalogue, Matcher, PatternError, PatternTable, Within};
use crate::responses::{ResponseKind, CATALOGUE};
use crate::tests::mock::{MockChannel, MockTimer};
use crate::Error;

fn classify(channel: &mut MockChannel, timer: &mut MockTimer, max_polls: u32) -> Result<ResponseKind, Error> {
    let catalogue = Catalogue::catalogue().unwrap();
    let mut matcher = Matcher::new(channel, timer, MockTimer::duration_ms(6_000), max_polls);
    matcher.classify(&catalogue)
}

#[test]
fn test_classify_ok_after_echo() {
    let mut channel = MockChannel::new();
    let mut timer = MockTimer::never_expires();
    channel.add_response(b"AT+CWMODE=1\r\n\r\nOK\r\n");

    assert_eq!(ResponseKind::Ok, classify(&mut channel, &mut timer, 1_000).unwrap());
    assert_eq!("\r\n", channel.remaining_as_string());
}

#[test]
fn test_classify_overlapping_partial_match() {
    let mut channel = MockChannel::new();
    let mut timer = MockTimer::never_expires();
    channel.add_response(b"OOK");

    assert_eq!(ResponseKind::Ok, classify(&mut channel, &mut timer, 1_000).unwrap());
}

#[test]
fn test_classify_restarts_on_failed_prefix() {
    let mut channel = MockChannel::new();
    let mut timer = MockTimer::never_expires();
    channel.add_response(b"no chno ip\r\n");

    assert_eq!(ResponseKind::NoIp, classify(&mut channel, &mut timer, 1_000).unwrap());
}

#[test]
fn test_classify_send_ok_wins_over_ok() {
    let mut channel = MockChannel::new();
    let mut timer = MockTimer::never_expires();
    channel.add_response(b"\r\nRecv 5 bytes\r\n\r\nSEND OK\r\n+IPD");

    assert_eq!(ResponseKind::SendOk, classify(&mut channel, &mut timer, 1_000).unwrap());
    assert_eq!("\r\n+IPD", channel.remaining_as_string());
}

#[test]
fn test_classify_every_catalogue_response() {
    for (literal, kind) in CATALOGUE {
        let mut channel = MockChannel::new();
        let mut timer = MockTimer::never_expires();
        channel.add_response(b"\r\nbusy p...\r\n");
        channel.add_response(literal);

        assert_eq!(kind, classify(&mut channel, &mut timer, 1_000).unwrap());
        assert_eq!(0, channel.remaining());
    }
}

#[test]
fn test_classify_first_completed_literal_decides() {
    let mut channel = MockChannel::new();
    let mut timer = MockTimer::never_expires();
    channel.add_response(b"WIFI CONNECTED\r\nOK\r\n");

    assert_eq!(ResponseKind::Linked, classify(&mut channel, &mut timer, 1_000).unwrap());
    assert_eq!(ResponseKind::Ok, classify(&mut channel, &mut timer, 1_000).unwrap());
}

#[test]
fn test_classify_timeout_by_poll_limit() {
    let mut channel = MockChannel::new();
    let mut timer = MockTimer::never_expires();
    channel.add_response(b"busy");

    assert_eq!(ResponseKind::Timeout, classify(&mut channel, &mut timer, 50).unwrap());
    assert_eq!(50, channel.receive_calls());
}

#[test]
fn test_classify_timeout_by_timer() {
    let mut channel = MockChannel::new();
    let mut timer = MockTimer::expires_after(10);

    assert_eq!(ResponseKind::Timeout, classify(&mut channel, &mut timer, 1_000).unwrap());
    assert_eq!(10, channel.receive_calls());
}

#[test]
fn test_classify_expired_timer_consumes_nothing() {
    let mut channel = MockChannel::new();
    let mut timer = MockTimer::expires_after(0);
    channel.add_response(b"OK");

    assert_eq!(ResponseKind::Timeout, classify(&mut channel, &mut timer, 1_000).unwrap());
    assert_eq!(2, channel.remaining());
}

#[test]
fn test_classify_timer_checked_while_bytes_arrive() {
    let mut channel = MockChannel::new();
    let mut timer = MockTimer::expires_after(3);
    channel.add_response(b"abcdefOK");

    assert_eq!(ResponseKind::Timeout, classify(&mut channel, &mut timer, 1_000).unwrap());
    assert_eq!("defOK", channel.remaining_as_string());
}

#[test]
fn test_classify_channel_error() {
    let mut channel = MockChannel::new();
    let mut timer = MockTimer::never_expires();
    channel.add_response(b"O");
    channel.fail_receive_at(1);

    assert_eq!(Error::Channel, classify(&mut channel, &mut timer, 1_000).unwrap_err());
}

#[test]
fn test_classify_timer_start_error() {
    let mut channel = MockChannel::new();
    let mut timer = MockTimer::new();
    timer.expect_start().times(1).returning(|_| Err(1));
    channel.add_ok_response();

    assert_eq!(Error::Timer, classify(&mut channel, &mut timer, 1_000).unwrap_err());
}

#[test]
fn test_classify_timer_wait_error() {
    let mut channel = MockChannel::new();
    let mut timer = MockTimer::new();
    timer.expect_start().returning(|_| Ok(()));
    timer.expect_wait().returning(|| nb::Result::Err(nb::Error::Other(5)));
    channel.add_ok_response();

    assert_eq!(Error::Timer, classify(&mut channel, &mut timer, 1_000).unwrap_err());
}

#[test]
fn test_classify_starts_timer_with_budget() {
    let mut channel = MockChannel::new();
    let mut timer = MockTimer::new();
    timer
        .expect_start()
        .times(1)
        .with(mockall::predicate::eq(MockTimer::duration_ms(250)))
        .returning(|_| Ok(()));
    timer.expect_wait().returning(|| nb::Result::Err(nb::Error::WouldBlock));
    channel.add_ok_response();

    let catalogue = Catalogue::catalogue().unwrap();
    let mut matcher = Matcher::new(&mut channel, &mut timer, MockTimer::duration_ms(250), 1_000);
    assert_eq!(ResponseKind::Ok, matcher.classify(&catalogue).unwrap());
}

#[test]
fn test_wait_for_returns_consumed_bytes() {
    let mut channel = MockChannel::new();
    let mut timer = MockTimer::never_expires();
    channel.add_response(b"abcOKdef");

    let mut matcher = Matcher::new(&mut channel, &mut timer, MockTimer::duration_ms(6_000), 1_000);
    assert_eq!(Some(5), matcher.wait_for(b"OK").unwrap());
    assert_eq!("def", channel.remaining_as_string());
}

#[test]
fn test_wait_for_timeout() {
    let mut channel = MockChannel::new();
    let mut timer = MockTimer::never_expires();
    channel.add_response(b"abcO");

    let mut matcher = Matcher::new(&mut channel, &mut timer, MockTimer::duration_ms(6_000), 100);
    assert_eq!(None, matcher.wait_for(b"OK").unwrap());
}

#[test]
fn test_wait_for_within_limit() {
    let mut channel = MockChannel::new();
    let mut timer = MockTimer::never_expires();
    channel.add_response(b"ab\r\n\r\ncd");

    let mut matcher = Matcher::new(&mut channel, &mut timer, MockTimer::duration_ms(6_000), 100);
    assert_eq!(Within::Found(6), matcher.wait_for_within(b"\r\n\r\n", 6).unwrap());
    assert_eq!("cd", channel.remaining_as_string());
}

#[test]
fn test_wait_for_within_limit_exceeded() {
    let mut channel = MockChannel::new();
    let mut timer = MockTimer::never_expires();
    channel.add_response(b"ab\r\n\r\ncd");

    let mut matcher = Matcher::new(&mut channel, &mut timer, MockTimer::duration_ms(6_000), 100);
    assert_eq!(Within::NotFound, matcher.wait_for_within(b"\r\n\r\n", 5).unwrap());
    assert_eq!("\ncd", channel.remaining_as_string());
}

#[test]
fn test_wait_for_within_timeout() {
    let mut channel = MockChannel::new();
    let mut timer = MockTimer::never_expires();
    channel.add_response(b"ab");

    let mut matcher = Matcher::new(&mut channel, &mut timer, MockTimer::duration_ms(6_000), 100);
    assert_eq!(Within::Timeout, matcher.wait_for_within(b"\r\n\r\n", 10).unwrap());
}

#[test]
fn test_wait_for_byte() {
    let mut channel = MockChannel::new();
    let mut timer = MockTimer::never_expires();
    channel.add_response(b"\r\nOK\r\n> ");

    let mut matcher = Matcher::new(&mut channel, &mut timer, MockTimer::duration_ms(6_000), 100);
    assert!(matcher.wait_for_byte(b'>').unwrap());
    assert!(!matcher.wait_for_byte(b'>').unwrap());
}

#[test]
fn test_pattern_table_empty_literal() {
    let result = PatternTable::<16>::new(&[(b"OK", ResponseKind::Ok), (b"", ResponseKind::Fail)]);
    assert_eq!(PatternError::EmptyPattern, result.unwrap_err());
}

#[test]
fn test_pattern_table_duplicate_literal() {
    let result = PatternTable::<16>::new(&[(b"OK", ResponseKind::Ok), (b"OK", ResponseKind::SendOk)]);
    assert_eq!(PatternError::DuplicatePattern, result.unwrap_err());
}

#[test]
fn test_pattern_table_ambiguous_literals() {
    let result = PatternTable::<16>::new(&[(b"OK", ResponseKind::Ok), (b"OKAY", ResponseKind::Ready)]);
    assert_eq!(PatternError::AmbiguousPattern, result.unwrap_err());

    let result = PatternTable::<16>::new(&[(b"ERROR", ResponseKind::Error), (b"RR", ResponseKind::Fail)]);
    assert_eq!(PatternError::AmbiguousPattern, result.unwrap_err());
}

#[test]
fn test_pattern_table_suffix_literals_accepted() {
    let table = PatternTable::<16>::new(&[(b"OK", ResponseKind::Ok), (b"SEND OK", ResponseKind::SendOk)]).unwrap();

    let mut state = table.start();
    let results: alloc::vec::Vec<_> = b"SEND OK".iter().map(|byte| table.advance(&mut state, *byte)).collect();

    assert_eq!(&[None, None, None, None, None, None], &results[..6]);
    assert_eq!(Some(ResponseKind::SendOk), results[6]);
}

#[test]
fn test_pattern_table_capacity_exceeded() {
    let result = PatternTable::<4>::new(&[(b"FAIL", ResponseKind::Fail)]);
    assert_eq!(PatternError::CapacityExceeded, result.unwrap_err());

    let table = PatternTable::<5>::new(&[(b"FAIL", ResponseKind::Fail)]).unwrap();
    assert_eq!(5, table.states());
}

#[test]
fn test_pattern_table_catalogue_states() {
    let catalogue = Catalogue::catalogue().unwrap();
    assert_eq!(65, catalogue.states());
}

#[test]
fn test_pattern_table_advance() {
    let table = PatternTable::<16>::single(b"ready", ResponseKind::Ready).unwrap();
    let mut state = table.start();

    for byte in b"rerea" {
        assert_eq!(None, table.advance(&mut state, *byte));
    }
    assert_eq!(None, table.advance(&mut state, b'd'));
    assert_eq!(Some(ResponseKind::Ready), table.advance(&mut state, b'y'));
}

#[test]
fn test_response_literals() {
    assert_eq!(Some(&b"SEND OK"[..]), ResponseKind::SendOk.literal());
    assert_eq!(Some(&b",CLOSE"[..]), ResponseKind::Unlinked.literal());
    assert_eq!(None, ResponseKind::Timeout.literal());

    assert!(ResponseKind::Timeout.is_failure());
    assert!(ResponseKind::Fail.is_failure());
    assert!(!ResponseKind::NoChange.is_failure());
}
