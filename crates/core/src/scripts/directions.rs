//! The destination-resolution script.
//!
//! Four subjects, in evaluation order: the raw destination request, the
//! disambiguation candidate list, the resolved destination, and the current
//! location (pre-set by the host, so the loop always skips it). Resolving a
//! destination marks the first three ready in one step; a caller-supplied
//! action fires once `FinalDestination` is ready.

use std::sync::Arc;

use async_trait::async_trait;

use crate::dialog::context::Context;
use crate::dialog::handler::{SubjectHandler, Turn};
use crate::dialog::subject::{Readiness, SlotKind, SlotValue, Subject};
use crate::errors::DialogError;
use crate::geo::{GeoPoint, Geocoder, Place};
use crate::nlu::{DialogStatus, IntentClassifier};
use crate::numbers::parse_choice;

pub const REQUESTED_DESTINATION: &str = "RequestedDestination";
pub const DESTINATION_OPTIONS: &str = "DestinationOptions";
pub const FINAL_DESTINATION: &str = "FinalDestination";
pub const CURRENT_LOCATION: &str = "CurrentLocation";

pub const GET_DIRECTIONS_INTENT: &str = "Get Directions";
pub const MENU_SELECTION_INTENT: &str = "Menu Selection";
const DESTINATION_ENTITY: &str = "Destination";

/// Intent confidence below this asks the user to rephrase.
const MIN_INTENT_SCORE: f32 = 0.50;
/// A top geocode candidate above this score resolves without asking.
const DIRECT_RESOLVE_SCORE: f32 = 90.0;
/// How many candidates the disambiguation menu offers.
const MAX_OPTIONS: usize = 3;

const WHERE_TO: &str = "Where To?";
const NOT_UNDERSTOOD: &str = "Sorry, I didn't get that.";
const LOW_CONFIDENCE_HINT: &str = "Try just telling me the address.";
const NOT_A_LOCATION: &str = "Nope, that's not a location, I just checked.";
const WHICH_ONE: &str = "I found multiple locations, which one?";

/// Builds the directions context.
///
/// `origin` seeds `CurrentLocation`; the host may overwrite it any time via
/// [`Context::subject_mut`]. `on_resolved` is the action producer notified
/// (every turn, see [`Context::add_action`]) once a destination is set.
pub fn directions_context<F>(
    classifier: Arc<dyn IntentClassifier>,
    geocoder: Arc<dyn Geocoder>,
    origin: GeoPoint,
    on_resolved: F,
) -> Context
where
    F: Fn(&Context) -> Vec<String> + Send + Sync + 'static,
{
    let mut context = Context::new();
    context.add_subject(Subject::with_handler(
        REQUESTED_DESTINATION,
        SlotKind::Text,
        Arc::new(RequestedDestinationHandler {
            classifier: Arc::clone(&classifier),
            geocoder,
        }),
    ));
    context.add_subject(Subject::with_handler(
        DESTINATION_OPTIONS,
        SlotKind::Candidates,
        Arc::new(DestinationOptionsHandler { classifier }),
    ));
    context.add_subject(Subject::new(FINAL_DESTINATION, SlotKind::Place));
    context.add_subject(Subject::preset(CURRENT_LOCATION, SlotValue::Point(origin)));
    context.add_action(on_resolved, [FINAL_DESTINATION]);
    context
}

struct RequestedDestinationHandler {
    classifier: Arc<dyn IntentClassifier>,
    geocoder: Arc<dyn Geocoder>,
}

#[async_trait]
impl SubjectHandler for RequestedDestinationHandler {
    async fn next(&self, turn: &mut Turn<'_>) -> Result<Vec<String>, DialogError> {
        let disambiguating =
            turn.get(DESTINATION_OPTIONS).and_then(Subject::candidates).is_some();

        let Some(query) = turn.input().map(str::to_string) else {
            // No input this turn: ask the opening question, unless we are
            // mid-disambiguation and the menu is already on screen.
            return Ok(if disambiguating { Vec::new() } else { vec![WHERE_TO.to_string()] });
        };

        // Evaluation order hands the literal utterance to this subject while
        // it stays not ready, so a pending candidate list means the reply is
        // an answer to the menu, not a new destination request.
        if disambiguating {
            return select_option(self.classifier.as_ref(), turn, &query).await;
        }

        let prediction = match self.classifier.predict(&query).await {
            Ok(prediction) => prediction,
            Err(_) => return Ok(vec![NOT_UNDERSTOOD.to_string()]),
        };

        if prediction.top_intent.name != GET_DIRECTIONS_INTENT {
            return Ok(vec![NOT_UNDERSTOOD.to_string()]);
        }
        if prediction.top_intent.score < MIN_INTENT_SCORE {
            return Ok(vec![LOW_CONFIDENCE_HINT.to_string()]);
        }
        if prediction.dialog.status == DialogStatus::InProgress {
            let prompt =
                prediction.dialog.prompt.clone().unwrap_or_else(|| NOT_UNDERSTOOD.to_string());
            return Ok(vec![prompt]);
        }

        let Some(destination) = prediction.entity(DESTINATION_ENTITY).map(str::to_string) else {
            return Ok(vec![NOT_UNDERSTOOD.to_string()]);
        };

        let bias = turn.get(CURRENT_LOCATION).and_then(Subject::point).copied();
        let mut candidates = match self.geocoder.geocode(&destination, bias.as_ref()).await {
            Ok(candidates) => candidates,
            Err(_) => Vec::new(),
        };

        if candidates.is_empty() {
            return Ok(vec![NOT_A_LOCATION.to_string()]);
        }

        if candidates.len() == 1 || candidates[0].score > DIRECT_RESOLVE_SCORE {
            let place = candidates.swap_remove(0);
            turn.current_mut().set_value(SlotValue::Text(destination))?;
            return resolve(turn, place);
        }

        // Ambiguous: remember the search text and the shortlist, stay not
        // ready, and let the next reply pick from the menu.
        candidates.truncate(MAX_OPTIONS);
        let mut lines = vec![WHICH_ONE.to_string()];
        lines.extend(candidates.iter().map(|place| place.label.clone()));

        turn.current_mut()
            .set_value_with(SlotValue::Text(destination), Readiness::Pending)?;
        if let Some(options) = turn.get_mut(DESTINATION_OPTIONS) {
            options.set_value_with(SlotValue::Candidates(candidates), Readiness::Pending)?;
        }
        Ok(lines)
    }
}

struct DestinationOptionsHandler {
    classifier: Arc<dyn IntentClassifier>,
}

#[async_trait]
impl SubjectHandler for DestinationOptionsHandler {
    async fn next(&self, turn: &mut Turn<'_>) -> Result<Vec<String>, DialogError> {
        let Some(reply) = turn.input().map(str::to_string) else {
            return Ok(Vec::new());
        };
        select_option(self.classifier.as_ref(), turn, &reply).await
    }
}

/// Tries to read `reply` as a menu answer against the stashed candidates.
///
/// Anything that is not a confident selection (wrong intent, classifier
/// failure, unparseable ordinal, out-of-range index) emits nothing and
/// leaves the slots pending, so the menu silently stays open.
async fn select_option(
    classifier: &dyn IntentClassifier,
    turn: &mut Turn<'_>,
    reply: &str,
) -> Result<Vec<String>, DialogError> {
    let prediction = match classifier.predict(reply).await {
        Ok(prediction) => prediction,
        Err(_) => return Ok(Vec::new()),
    };
    if prediction.top_intent.name != MENU_SELECTION_INTENT {
        return Ok(Vec::new());
    }
    let Ok(choice) = parse_choice(reply) else {
        return Ok(Vec::new());
    };

    let selected = turn
        .get(DESTINATION_OPTIONS)
        .and_then(Subject::candidates)
        .and_then(|places| choice.checked_sub(1).and_then(|index| places.get(index)))
        .cloned();
    let Some(place) = selected else {
        return Ok(Vec::new());
    };

    resolve(turn, place)
}

/// Commits a resolved destination: retires the request and option slots,
/// stores the place, and reports the single confirmation line.
fn resolve(turn: &mut Turn<'_>, place: Place) -> Result<Vec<String>, DialogError> {
    let line = format!("Getting Directions to: {}", place.label);
    if let Some(requested) = turn.get_mut(REQUESTED_DESTINATION) {
        requested.mark_ready();
    }
    if let Some(options) = turn.get_mut(DESTINATION_OPTIONS) {
        options.mark_ready();
    }
    if let Some(final_destination) = turn.get_mut(FINAL_DESTINATION) {
        final_destination.set_value(SlotValue::Place(place))?;
    }
    Ok(vec![line])
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::{
        directions_context, CURRENT_LOCATION, DESTINATION_OPTIONS, FINAL_DESTINATION,
        GET_DIRECTIONS_INTENT, MENU_SELECTION_INTENT, REQUESTED_DESTINATION,
    };
    use crate::dialog::context::Context;
    use crate::dialog::subject::Subject;
    use crate::geo::{GeoPoint, GeocodeError, Geocoder, Place};
    use crate::nlu::{
        ClassifierError, DialogState, DialogStatus, EntityValue, Intent, IntentClassifier,
        Prediction,
    };

    struct StubClassifier {
        responses: Mutex<VecDeque<Result<Prediction, ClassifierError>>>,
    }

    impl StubClassifier {
        fn new(
            responses: impl IntoIterator<Item = Result<Prediction, ClassifierError>>,
        ) -> Arc<Self> {
            Arc::new(Self { responses: Mutex::new(responses.into_iter().collect()) })
        }
    }

    #[async_trait]
    impl IntentClassifier for StubClassifier {
        async fn predict(&self, _text: &str) -> Result<Prediction, ClassifierError> {
            self.responses
                .lock()
                .expect("responses lock")
                .pop_front()
                .unwrap_or_else(|| Err(ClassifierError::Transport("exhausted".to_string())))
        }
    }

    struct StubGeocoder {
        places: Vec<Place>,
        fail: bool,
        bias_log: Mutex<Vec<Option<GeoPoint>>>,
    }

    impl StubGeocoder {
        fn returning(places: Vec<Place>) -> Arc<Self> {
            Arc::new(Self { places, fail: false, bias_log: Mutex::new(Vec::new()) })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { places: Vec::new(), fail: true, bias_log: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl Geocoder for StubGeocoder {
        async fn geocode(
            &self,
            _query: &str,
            bias: Option<&GeoPoint>,
        ) -> Result<Vec<Place>, GeocodeError> {
            self.bias_log.lock().expect("bias lock").push(bias.copied());
            if self.fail {
                return Err(GeocodeError::Transport("unreachable".to_string()));
            }
            Ok(self.places.clone())
        }
    }

    fn get_directions(score: f32, destination: &str) -> Result<Prediction, ClassifierError> {
        let mut prediction = Prediction {
            top_intent: Intent { name: GET_DIRECTIONS_INTENT.to_string(), score },
            entities: Default::default(),
            dialog: Default::default(),
        };
        prediction.entities.insert(
            "Destination".to_string(),
            vec![EntityValue { value: destination.to_string(), score: 0.95 }],
        );
        Ok(prediction)
    }

    fn menu_selection() -> Result<Prediction, ClassifierError> {
        Ok(Prediction {
            top_intent: Intent { name: MENU_SELECTION_INTENT.to_string(), score: 0.9 },
            entities: Default::default(),
            dialog: Default::default(),
        })
    }

    fn other_intent(name: &str) -> Result<Prediction, ClassifierError> {
        Ok(Prediction {
            top_intent: Intent { name: name.to_string(), score: 0.9 },
            entities: Default::default(),
            dialog: Default::default(),
        })
    }

    fn place(label: &str, score: f32) -> Place {
        Place { label: label.to_string(), score, location: GeoPoint { x: 1.0, y: 2.0 } }
    }

    fn origin() -> GeoPoint {
        GeoPoint { x: -93.27, y: 44.98 }
    }

    type ResolvedLog = Arc<Mutex<Vec<String>>>;

    fn build(
        classifier: Arc<StubClassifier>,
        geocoder: Arc<StubGeocoder>,
    ) -> (Context, ResolvedLog) {
        let resolved: ResolvedLog = ResolvedLog::default();
        let log = Arc::clone(&resolved);
        let context = directions_context(classifier, geocoder, origin(), move |context| {
            let label = context
                .subject(FINAL_DESTINATION)
                .and_then(Subject::place)
                .map(|place| place.label.clone())
                .unwrap_or_default();
            log.lock().expect("resolved lock").push(label);
            Vec::new()
        });
        (context, resolved)
    }

    #[tokio::test]
    async fn empty_input_asks_where_to() {
        let (mut context, _) = build(StubClassifier::new([]), StubGeocoder::returning(vec![]));
        let output = context.evaluate("").await.expect("evaluate");
        assert_eq!(output, vec!["Where To?".to_string()]);
        assert!(!context.is_ready());
    }

    #[tokio::test]
    async fn single_candidate_resolves_immediately() {
        let classifier = StubClassifier::new([get_directions(0.80, "123 Main St")]);
        let geocoder = StubGeocoder::returning(vec![place("123 Main St, Springfield", 82.0)]);
        let (mut context, resolved) = build(classifier, geocoder);

        let output = context.evaluate("Take me to 123 Main St").await.expect("evaluate");

        assert_eq!(output, vec!["Getting Directions to: 123 Main St, Springfield".to_string()]);
        let final_destination = context.subject(FINAL_DESTINATION).expect("subject");
        assert!(final_destination.is_ready());
        assert_eq!(
            final_destination.place().map(|place| place.label.as_str()),
            Some("123 Main St, Springfield")
        );
        assert!(context.is_ready());
        assert_eq!(
            resolved.lock().expect("resolved lock").as_slice(),
            ["123 Main St, Springfield".to_string()]
        );
    }

    #[tokio::test]
    async fn confident_top_candidate_skips_disambiguation() {
        let classifier = StubClassifier::new([get_directions(0.80, "city hall")]);
        let geocoder = StubGeocoder::returning(vec![
            place("City Hall, Minneapolis", 98.5),
            place("City Hall, St Paul", 74.0),
        ]);
        let (mut context, _) = build(classifier, geocoder);

        let output = context.evaluate("directions to city hall").await.expect("evaluate");
        assert_eq!(output, vec!["Getting Directions to: City Hall, Minneapolis".to_string()]);
    }

    #[tokio::test]
    async fn ambiguous_candidates_open_a_menu() {
        let classifier = StubClassifier::new([get_directions(0.80, "main st")]);
        let geocoder = StubGeocoder::returning(vec![
            place("Main St, Springfield", 88.0),
            place("Main St, Shelbyville", 85.0),
            place("Main St, Capital City", 80.0),
        ]);
        let (mut context, resolved) = build(classifier, geocoder);

        let output = context.evaluate("take me to main st").await.expect("evaluate");

        assert_eq!(
            output,
            vec![
                "I found multiple locations, which one?".to_string(),
                "Main St, Springfield".to_string(),
                "Main St, Shelbyville".to_string(),
                "Main St, Capital City".to_string(),
            ]
        );
        let requested = context.subject(REQUESTED_DESTINATION).expect("subject");
        assert!(!requested.is_ready());
        assert_eq!(requested.text(), Some("main st"));
        let options = context.subject(DESTINATION_OPTIONS).expect("subject");
        assert!(!options.is_ready());
        assert_eq!(options.candidates().map(<[Place]>::len), Some(3));
        assert!(resolved.lock().expect("resolved lock").is_empty());
    }

    #[tokio::test]
    async fn menu_is_capped_at_three_candidates() {
        let classifier = StubClassifier::new([get_directions(0.80, "main st")]);
        let geocoder = StubGeocoder::returning(vec![
            place("One", 88.0),
            place("Two", 85.0),
            place("Three", 80.0),
            place("Four", 75.0),
        ]);
        let (mut context, _) = build(classifier, geocoder);

        let output = context.evaluate("take me to main st").await.expect("evaluate");
        assert_eq!(output.len(), 4); // prompt + three labels
        assert!(!output.contains(&"Four".to_string()));
    }

    #[tokio::test]
    async fn menu_reply_two_resolves_the_second_candidate() {
        let classifier = StubClassifier::new([
            get_directions(0.80, "main st"),
            menu_selection(),
        ]);
        let geocoder = StubGeocoder::returning(vec![
            place("Main St, Springfield", 88.0),
            place("Main St, Shelbyville", 85.0),
            place("Main St, Capital City", 80.0),
        ]);
        let (mut context, resolved) = build(classifier, geocoder);

        context.evaluate("take me to main st").await.expect("evaluate");
        let output = context.evaluate("two").await.expect("evaluate");

        assert_eq!(output, vec!["Getting Directions to: Main St, Shelbyville".to_string()]);
        assert!(context.subject(FINAL_DESTINATION).expect("subject").is_ready());
        assert!(context.is_ready());
        assert_eq!(
            resolved.lock().expect("resolved lock").as_slice(),
            ["Main St, Shelbyville".to_string()]
        );
    }

    #[tokio::test]
    async fn unparseable_menu_reply_stays_silent() {
        let classifier = StubClassifier::new([
            get_directions(0.80, "main st"),
            menu_selection(),
        ]);
        let geocoder = StubGeocoder::returning(vec![
            place("Main St, Springfield", 88.0),
            place("Main St, Shelbyville", 85.0),
        ]);
        let (mut context, _) = build(classifier, geocoder);

        context.evaluate("take me to main st").await.expect("evaluate");
        let output = context.evaluate("the nicer looking one").await.expect("evaluate");

        assert!(output.is_empty());
        assert!(!context.subject(FINAL_DESTINATION).expect("subject").is_ready());
    }

    #[tokio::test]
    async fn out_of_range_menu_choice_stays_silent() {
        let classifier = StubClassifier::new([
            get_directions(0.80, "main st"),
            menu_selection(),
        ]);
        let geocoder = StubGeocoder::returning(vec![
            place("Main St, Springfield", 88.0),
            place("Main St, Shelbyville", 85.0),
        ]);
        let (mut context, _) = build(classifier, geocoder);

        context.evaluate("take me to main st").await.expect("evaluate");
        let output = context.evaluate("9").await.expect("evaluate");

        assert!(output.is_empty());
        assert!(!context.subject(FINAL_DESTINATION).expect("subject").is_ready());
    }

    #[tokio::test]
    async fn non_menu_intent_during_disambiguation_stays_silent() {
        let classifier = StubClassifier::new([
            get_directions(0.80, "main st"),
            other_intent("Small Talk"),
        ]);
        let geocoder = StubGeocoder::returning(vec![
            place("Main St, Springfield", 88.0),
            place("Main St, Shelbyville", 85.0),
        ]);
        let (mut context, _) = build(classifier, geocoder);

        context.evaluate("take me to main st").await.expect("evaluate");
        let output = context.evaluate("nice weather today").await.expect("evaluate");
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn classifier_failure_falls_back_without_escaping() {
        let classifier =
            StubClassifier::new([Err(ClassifierError::Transport("down".to_string()))]);
        let (mut context, _) = build(classifier, StubGeocoder::returning(vec![]));

        let output = context.evaluate("take me home").await.expect("evaluate");
        assert_eq!(output, vec!["Sorry, I didn't get that.".to_string()]);
        assert!(!context.subject(REQUESTED_DESTINATION).expect("subject").is_ready());
    }

    #[tokio::test]
    async fn wrong_intent_falls_back() {
        let classifier = StubClassifier::new([other_intent("Weather")]);
        let (mut context, _) = build(classifier, StubGeocoder::returning(vec![]));

        let output = context.evaluate("will it rain").await.expect("evaluate");
        assert_eq!(output, vec!["Sorry, I didn't get that.".to_string()]);
    }

    #[tokio::test]
    async fn low_confidence_asks_for_an_address() {
        let classifier = StubClassifier::new([get_directions(0.30, "somewhere")]);
        let (mut context, _) = build(classifier, StubGeocoder::returning(vec![]));

        let output = context.evaluate("um maybe go somewhere").await.expect("evaluate");
        assert_eq!(output, vec!["Try just telling me the address.".to_string()]);
    }

    #[tokio::test]
    async fn classifier_sub_dialog_prompt_is_echoed() {
        let classifier = StubClassifier::new([Ok(Prediction {
            top_intent: Intent { name: GET_DIRECTIONS_INTENT.to_string(), score: 0.85 },
            entities: Default::default(),
            dialog: DialogState {
                status: DialogStatus::InProgress,
                prompt: Some("Which city is that in?".to_string()),
            },
        })]);
        let (mut context, _) = build(classifier, StubGeocoder::returning(vec![]));

        let output = context.evaluate("take me to main st").await.expect("evaluate");
        assert_eq!(output, vec!["Which city is that in?".to_string()]);
        assert!(!context.subject(REQUESTED_DESTINATION).expect("subject").is_ready());
    }

    #[tokio::test]
    async fn missing_destination_entity_falls_back() {
        let classifier = StubClassifier::new([Ok(Prediction {
            top_intent: Intent { name: GET_DIRECTIONS_INTENT.to_string(), score: 0.85 },
            entities: Default::default(),
            dialog: Default::default(),
        })]);
        let (mut context, _) = build(classifier, StubGeocoder::returning(vec![]));

        let output = context.evaluate("take me there").await.expect("evaluate");
        assert_eq!(output, vec!["Sorry, I didn't get that.".to_string()]);
    }

    #[tokio::test]
    async fn zero_geocode_matches_report_not_a_location() {
        let classifier = StubClassifier::new([get_directions(0.80, "xyzzy")]);
        let (mut context, _) = build(classifier, StubGeocoder::returning(vec![]));

        let output = context.evaluate("take me to xyzzy").await.expect("evaluate");
        assert_eq!(output, vec!["Nope, that's not a location, I just checked.".to_string()]);
        assert!(!context.subject(REQUESTED_DESTINATION).expect("subject").is_ready());
    }

    #[tokio::test]
    async fn geocoder_failure_degrades_to_not_a_location() {
        let classifier = StubClassifier::new([get_directions(0.80, "main st")]);
        let (mut context, _) = build(classifier, StubGeocoder::failing());

        let output = context.evaluate("take me to main st").await.expect("evaluate");
        assert_eq!(output, vec!["Nope, that's not a location, I just checked.".to_string()]);
    }

    #[tokio::test]
    async fn geocode_is_biased_toward_current_location() {
        let classifier = StubClassifier::new([get_directions(0.80, "main st")]);
        let geocoder = StubGeocoder::returning(vec![place("Main St, Springfield", 95.0)]);
        let (mut context, _) = build(classifier, Arc::clone(&geocoder));

        context.evaluate("take me to main st").await.expect("evaluate");

        let biases = geocoder.bias_log.lock().expect("bias lock").clone();
        assert_eq!(biases, vec![Some(origin())]);
        assert!(context.subject(CURRENT_LOCATION).expect("subject").is_ready());
    }
}
