//! Instrument outbound emails, replay tracking events and aggregate them

use chrono::{Duration, TimeZone, Utc};
use leadflow_core::config::TrackingConfig;
use leadflow_core::services::engagement::{aggregate_window, daily_trend, window_start};
use leadflow_core::{EmailTracker, EngagementRates};
use leadflow_types::{SentEmail, TrackingEvent};

const TEMPLATE: &str = r#"<html><body>
<p>Hi {{name}},</p>
<p>See our <a href="https://leadflow.io/demo?ref=mail&amp;v=2">demo</a> or
<a class="cta" href='https://leadflow.io/pricing'>pricing</a>.</p>
<p><a href="mailto:sales@leadflow.io">Reply</a></p>
</body></html>"#;

#[test]
fn test_instrument_then_aggregate() {
    let tracker = EmailTracker::new(TrackingConfig {
        base_url: "https://app.leadflow.io/".to_string(),
    });
    let now = Utc.with_ymd_and_hms(2024, 3, 8, 12, 0, 0).unwrap();

    let sent: Vec<SentEmail> = (1..=4)
        .map(|id| {
            let instrumented = tracker.instrument(TEMPLATE, id, Some(100 + id));
            SentEmail {
                id,
                lead_id: Some(100 + id),
                html_body: instrumented.html,
                sent_at: now - Duration::days(id),
            }
        })
        .collect();

    let body = &sent[0].html_body;
    assert!(body.contains(
        "href=\"https://app.leadflow.io/api/track/click?url=https%3A%2F%2Fleadflow.io%2Fdemo%3Fref%3Dmail%26v%3D2&eid=1&lid=101\""
    ));
    assert!(body.contains(
        "class=\"cta\" href='https://app.leadflow.io/api/track/click?url=https%3A%2F%2Fleadflow.io%2Fpricing&eid=1&lid=101'"
    ));
    assert!(body.contains("href=\"mailto:sales@leadflow.io\""));
    assert!(body.contains(
        "<img src=\"https://app.leadflow.io/api/track/open?sentEmailId=1&leadId=101\""
    ));
    assert_eq!(body.matches("<img").count(), 1);

    // Re-instrumenting must not wrap links twice
    let again = tracker.rewrite_links(body, 1, Some(101));
    assert_eq!(&again, body);

    let events = vec![
        TrackingEvent::open(1, Some(101), now - Duration::hours(20)),
        TrackingEvent::open(1, Some(101), now - Duration::hours(19)),
        TrackingEvent::click(1, Some(101), "https://leadflow.io/pricing", now - Duration::hours(19)),
        TrackingEvent::click(2, Some(102), "https://leadflow.io/demo", now - Duration::hours(30)),
        TrackingEvent::open(3, Some(103), now - Duration::hours(60)),
        TrackingEvent::open(99, None, now - Duration::hours(1)),
    ];

    let start = window_start(now, 7);
    let window = aggregate_window(&sent, &events, start, now);
    assert_eq!(window.sent, 4);
    assert_eq!(window.opened, 2);
    assert_eq!(window.clicked, 2);
    assert_eq!(window.engaged, 3);

    let rates = EngagementRates::from(&window);
    assert_eq!(rates.open_rate, 50);
    assert_eq!(rates.click_rate, 50);
    assert_eq!(rates.engagement_rate, 75);
    assert_eq!(rates.engagement_score, 50);

    let trend = daily_trend(&sent, &events, start, now);
    assert_eq!(trend.len(), 8);
    assert_eq!(trend.iter().map(|b| b.sent).sum::<u64>(), 4);
    let last = trend.last().unwrap();
    assert_eq!(last.date, now.date_naive());
    assert_eq!(last.sent, 0);
}
