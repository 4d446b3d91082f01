//! Daily conversation report card
//!
//! Turns a queue listing, a per-queue aggregate query and a conversation
//! detail query into `{totals, queues, worstQueues, recentAbandons}`.
//!
//! The functions here only read and write the [`DataBag`] they are given.

use super::metrics::{
    is_truthy, round_half_up, safe_divide, safe_number_opt, serialize_number,
};
use super::{param_str, ExtensionRegistry};
use crate::domain::{DataBag, TransformError};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::ops::AddAssign;

/// Extension name the functions are registered under
pub const EXTENSION_NAME: &str = "daily_conversation_report_card";

/// Maximum rows in `worstQueues`
pub const WORST_QUEUES_LIMIT: usize = 10;

/// Maximum rows in `recentAbandons`
pub const RECENT_ABANDONS_LIMIT: usize = 25;

/// Registers `flattenQueueData`, `setCustomerParticipants` and `prepareReport`
pub fn register(registry: &mut ExtensionRegistry) {
    registry.register(format!("{EXTENSION_NAME}.flattenQueueData"), flatten_queue_data);
    registry.register(
        format!("{EXTENSION_NAME}.setCustomerParticipants"),
        set_customer_participants,
    );
    registry.register(format!("{EXTENSION_NAME}.prepareReport"), prepare_report);
}

/// Dense metric map: every expected metric present, observed ones overlaid
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetricMap(Map<String, Value>);

impl MetricMap {
    /// The zero-valued default for every metric the report reads
    pub fn defaults() -> Self {
        let value = json!({
            "nOffered": { "metric": "nOffered", "stats": { "count": 0 } },
            "tAnswered": { "metric": "tAnswered", "stats": { "count": 0, "sum": 0 } },
            "tAbandon": { "metric": "tAbandon", "stats": { "count": 0, "sum": 0 } },
            "tWait": { "metric": "tWait", "stats": { "count": 0, "sum": 0 } },
            "tHandle": { "metric": "tHandle", "stats": { "count": 0, "sum": 0 } },
            "nOverSla": { "metric": "nOverSla", "stats": { "count": 0 } },
            "tShortAbandon": { "metric": "tShortAbandon", "stats": { "count": 0 } },
            "tFlowOut": { "metric": "tFlowOut", "stats": { "count": 0 } },
            "oServiceLevel": {
                "metric": "oServiceLevel",
                "stats": { "ratio": 0, "numerator": 0, "denominator": 0, "target": 0 }
            },
            "oServiceTarget": { "metric": "oServiceTarget", "stats": { "target": 0 } }
        });
        match value {
            Value::Object(map) => Self(map),
            _ => Self(Map::new()),
        }
    }

    /// Overlays a sparse metric array on the defaults
    ///
    /// An observed entry replaces the default for its name entirely. Entries
    /// without a string `metric` field are ignored.
    pub fn from_sparse(metrics: &[Value]) -> Self {
        let mut map = Self::defaults();
        for metric in metrics {
            if let Some(name) = metric.get("metric").and_then(Value::as_str) {
                map.0.insert(name.to_string(), metric.clone());
            }
        }
        map
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// `metrics[name].stats[field]` as a safe number
    pub fn stat(&self, name: &str, field: &str) -> f64 {
        safe_number_opt(
            self.0
                .get(name)
                .and_then(|m| m.get("stats"))
                .and_then(|s| s.get(field)),
            0.0,
        )
    }
}

/// Raw per-queue figures, summed field-wise into the totals
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QueueCounts {
    pub offered: f64,
    pub answered: f64,
    pub abandoned: f64,
    pub over_sla: f64,
    pub short_abandons: f64,
    pub flow_out: f64,
    pub answered_wait_sum: f64,
    pub answered_wait_count: f64,
    pub handle_sum: f64,
    pub handle_count: f64,
    pub sl_numerator: f64,
    pub sl_denominator: f64,
    /// Ratio as reported by the API; never summed
    pub sl_reported_ratio: f64,
}

impl QueueCounts {
    pub fn from_metrics(metrics: &MetricMap) -> Self {
        let counts = Self {
            offered: metrics.stat("nOffered", "count"),
            answered: metrics.stat("tAnswered", "count"),
            abandoned: metrics.stat("tAbandon", "count"),
            over_sla: metrics.stat("nOverSla", "count"),
            short_abandons: metrics.stat("tShortAbandon", "count"),
            flow_out: metrics.stat("tFlowOut", "count"),
            answered_wait_sum: metrics.stat("tAnswered", "sum"),
            answered_wait_count: metrics.stat("tAnswered", "count"),
            handle_sum: metrics.stat("tHandle", "sum"),
            handle_count: metrics.stat("tHandle", "count"),
            sl_numerator: metrics.stat("oServiceLevel", "numerator"),
            sl_denominator: metrics.stat("oServiceLevel", "denominator"),
            sl_reported_ratio: metrics.stat("oServiceLevel", "ratio"),
        };
        counts.with_covered_denominator()
    }

    /// A zero denominator with a positive numerator is treated as fully covered
    fn with_covered_denominator(mut self) -> Self {
        if self.sl_denominator == 0.0 && self.sl_numerator > 0.0 {
            self.sl_denominator = self.sl_numerator;
        }
        self
    }

    /// Derived figures; rows and totals both go through here
    pub fn derive(&self) -> DerivedStats {
        let counts = self.with_covered_denominator();

        let mut ratio = counts.sl_reported_ratio;
        if ratio == 0.0 && counts.sl_denominator > 0.0 {
            ratio = safe_divide(counts.sl_numerator, counts.sl_denominator, 0.0);
        }

        DerivedStats {
            offered: counts.offered,
            answered: counts.answered,
            abandoned: counts.abandoned,
            over_sla: counts.over_sla,
            short_abandons: counts.short_abandons,
            flow_out: counts.flow_out,
            abandon_rate_percent: round_half_up(
                safe_divide(counts.abandoned, counts.offered, 0.0) * 1000.0,
            ) / 10.0,
            asa_seconds: round_half_up(safe_divide(
                counts.answered_wait_sum,
                counts.answered_wait_count,
                0.0,
            )),
            aht_seconds: round_half_up(safe_divide(counts.handle_sum, counts.handle_count, 0.0)),
            service_level_ratio: ratio,
            service_level_percent: round_half_up(ratio * 100.0),
        }
    }
}

impl AddAssign<&QueueCounts> for QueueCounts {
    fn add_assign(&mut self, other: &QueueCounts) {
        self.offered += other.offered;
        self.answered += other.answered;
        self.abandoned += other.abandoned;
        self.over_sla += other.over_sla;
        self.short_abandons += other.short_abandons;
        self.flow_out += other.flow_out;
        self.answered_wait_sum += other.answered_wait_sum;
        self.answered_wait_count += other.answered_wait_count;
        self.handle_sum += other.handle_sum;
        self.handle_count += other.handle_count;
        self.sl_numerator += other.sl_numerator;
        self.sl_denominator += other.sl_denominator;
    }
}

/// Figures shown for a queue row and for the totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedStats {
    #[serde(serialize_with = "serialize_number")]
    pub offered: f64,
    #[serde(serialize_with = "serialize_number")]
    pub answered: f64,
    #[serde(serialize_with = "serialize_number")]
    pub abandoned: f64,
    #[serde(serialize_with = "serialize_number")]
    pub over_sla: f64,
    #[serde(serialize_with = "serialize_number")]
    pub short_abandons: f64,
    #[serde(serialize_with = "serialize_number")]
    pub flow_out: f64,
    /// One-decimal percent
    #[serde(serialize_with = "serialize_number")]
    pub abandon_rate_percent: f64,
    #[serde(serialize_with = "serialize_number")]
    pub asa_seconds: f64,
    #[serde(serialize_with = "serialize_number")]
    pub aht_seconds: f64,
    #[serde(serialize_with = "serialize_number")]
    pub service_level_ratio: f64,
    #[serde(serialize_with = "serialize_number")]
    pub service_level_percent: f64,
}

/// One aggregated queue
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueRow {
    /// Queue entity from the lookup, or `{id, name}` when unknown
    pub queue: Value,
    pub queue_id: Value,
    /// Queue display name, for templates
    pub name: Value,
    pub metrics: MetricMap,
    #[serde(flatten)]
    pub stats: DerivedStats,
    #[serde(skip)]
    pub counts: QueueCounts,
}

/// Display fields of one abandoned conversation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentAbandon {
    pub conversation_id: Value,
    pub conversation_start: Value,
    pub queue_name: Value,
    pub ani: Value,
    pub dnis: Value,
}

/// Full report written to the DataBag
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub totals: DerivedStats,
    pub queues: Vec<QueueRow>,
    pub worst_queues: Vec<QueueRow>,
    pub recent_abandons: Vec<RecentAbandon>,
}

/// Builds `{id → entity}` from a list of entities; duplicate ids keep the last
pub fn queue_lookup(entities: &[Value]) -> Map<String, Value> {
    let mut lookup = Map::new();
    for entity in entities {
        let Some(id) = entity.get("id").and_then(lookup_key) else {
            continue;
        };
        lookup.insert(id, entity.clone());
    }
    lookup
}

/// String or numeric id as a lookup key; numbers key by their decimal text
fn lookup_key(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Resolves `customerParticipant` and `queue` on each conversation in place
///
/// The `customer` participant gets the last non-empty `ani` and `dnis` of
/// its sessions; the `acd` participant becomes the queue reference.
pub fn join_participants(conversations: &mut [Value]) {
    for conversation in conversations.iter_mut() {
        let Some(object) = conversation.as_object_mut() else {
            continue;
        };

        let mut customer = Value::Object(Map::new());
        let mut queue = Value::Object(Map::new());

        let participants = object
            .get("participants")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for participant in participants {
            match participant.get("purpose").and_then(Value::as_str) {
                Some("customer") => {
                    let mut resolved = participant.clone();
                    let sessions = participant
                        .get("sessions")
                        .and_then(Value::as_array)
                        .map(Vec::as_slice)
                        .unwrap_or_default();
                    for session in sessions {
                        for field in ["ani", "dnis"] {
                            if let Some(value) = session.get(field).filter(|v| is_truthy(v)) {
                                if let Some(target) = resolved.as_object_mut() {
                                    target.insert(field.to_string(), value.clone());
                                }
                            }
                        }
                    }
                    customer = resolved;
                }
                Some("acd") => queue = participant,
                _ => {}
            }
        }

        object.insert("customerParticipant".to_string(), customer);
        object.insert("queue".to_string(), queue);
    }
}

fn queue_row(result: &Value, lookup: &Map<String, Value>) -> QueueRow {
    let queue_id = result
        .get("group")
        .and_then(|g| g.get("queueId"))
        .filter(|v| is_truthy(v))
        .cloned();

    let queue = queue_id
        .as_ref()
        .and_then(lookup_key)
        .and_then(|id| lookup.get(&id))
        .cloned()
        .unwrap_or_else(|| {
            let fallback = queue_id.clone().unwrap_or_else(|| json!("unknown"));
            json!({ "id": fallback, "name": fallback })
        });

    let metrics_array = result
        .get("data")
        .and_then(|d| d.get(0))
        .and_then(|d| d.get("metrics"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let metrics = MetricMap::from_sparse(metrics_array);
    let counts = QueueCounts::from_metrics(&metrics);

    QueueRow {
        queue_id: queue.get("id").cloned().unwrap_or(Value::Null),
        name: queue.get("name").cloned().unwrap_or(Value::Null),
        queue,
        metrics,
        stats: counts.derive(),
        counts,
    }
}

fn recent_abandon(conversation: &Value) -> RecentAbandon {
    let truthy_or_empty = |value: Option<&Value>| {
        value
            .filter(|v| is_truthy(v))
            .cloned()
            .unwrap_or_else(|| Value::String(String::new()))
    };

    RecentAbandon {
        conversation_id: conversation
            .get("conversationId")
            .cloned()
            .unwrap_or(Value::Null),
        conversation_start: conversation
            .get("conversationStart")
            .cloned()
            .unwrap_or(Value::Null),
        queue_name: truthy_or_empty(
            conversation
                .get("queue")
                .and_then(|q| q.get("participantName")),
        ),
        ani: truthy_or_empty(
            conversation
                .get("customerParticipant")
                .and_then(|c| c.get("ani")),
        ),
        dnis: truthy_or_empty(
            conversation
                .get("customerParticipant")
                .and_then(|c| c.get("dnis")),
        ),
    }
}

/// Builds the report from a queue lookup, aggregate results and joined conversations
pub fn build_report(
    lookup: &Map<String, Value>,
    results: &[Value],
    conversations: &[Value],
) -> Report {
    let rows: Vec<QueueRow> = results.iter().map(|r| queue_row(r, lookup)).collect();

    let mut totals = QueueCounts::default();
    for row in &rows {
        totals += &row.counts;
    }

    let mut queues = rows.clone();
    queues.sort_by(|a, b| b.stats.offered.total_cmp(&a.stats.offered));

    let mut worst_queues = rows;
    worst_queues.sort_by(|a, b| {
        a.stats
            .service_level_ratio
            .total_cmp(&b.stats.service_level_ratio)
            .then_with(|| b.stats.offered.total_cmp(&a.stats.offered))
    });
    worst_queues.truncate(WORST_QUEUES_LIMIT);

    let recent_abandons = conversations
        .iter()
        .take(RECENT_ABANDONS_LIMIT)
        .map(recent_abandon)
        .collect();

    Report {
        totals: totals.derive(),
        queues,
        worst_queues,
        recent_abandons,
    }
}

fn array_at<'a>(bag: &'a DataBag, key: &str, field: &str) -> &'a [Value] {
    bag.get(key)
        .and_then(|v| v.get(field))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// `bag.queues = {id → entity}` from `bag[queues].entities`
pub fn flatten_queue_data(bag: &mut DataBag, params: &Map<String, Value>) -> Result<(), TransformError> {
    let source = param_str(params, "queues", "get_queues");
    let lookup = queue_lookup(array_at(bag, &source, "entities"));
    bag.insert("queues", Value::Object(lookup));
    Ok(())
}

/// Participant join on `bag[source].conversations`; a missing dataset is a no-op
pub fn set_customer_participants(
    bag: &mut DataBag,
    params: &Map<String, Value>,
) -> Result<(), TransformError> {
    let source = param_str(params, "source", "daily_abandons_detail");
    if let Some(conversations) = bag
        .get_mut(&source)
        .and_then(|v| v.get_mut("conversations"))
        .and_then(Value::as_array_mut)
    {
        join_participants(conversations);
    }
    Ok(())
}

/// Writes `bag[output]` = `{totals, queues, worstQueues, recentAbandons}`
///
/// Also refreshes `bag.queues` and joins participants on the detail dataset.
/// Other keys already present under `bag[output]` are kept.
pub fn prepare_report(bag: &mut DataBag, params: &Map<String, Value>) -> Result<(), TransformError> {
    let aggregates = param_str(params, "aggregates", "daily_voice_queue_agg");
    let details = param_str(params, "details", "daily_abandons_detail");
    let output = param_str(params, "output", "report");

    flatten_queue_data(bag, params)?;

    let mut join_params = params.clone();
    join_params.insert("source".to_string(), Value::String(details.clone()));
    set_customer_participants(bag, &join_params)?;

    let lookup = bag
        .get("queues")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let report = build_report(
        &lookup,
        array_at(bag, &aggregates, "results"),
        array_at(bag, &details, "conversations"),
    );

    let report = serde_json::to_value(&report).map_err(|e| TransformError::Failed {
        name: format!("{EXTENSION_NAME}.prepareReport"),
        message: format!("Failed to serialize report: {e}"),
    })?;

    match (bag.entry_mut(&output), report) {
        (Value::Object(existing), Value::Object(fields)) => existing.extend(fields),
        (target, report) => *target = report,
    }
    Ok(())
}
