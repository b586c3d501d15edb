use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    subject_relevance::apps::run_score_batches(std::env::args().skip(1))
}
