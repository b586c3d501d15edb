use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    subject_relevance::apps::run_filter_summaries(std::env::args().skip(1))
}
