fn main() {
    let input = std::env::args().nth(1).expect("You must provide a filter to parse");

    println!("Trying to parse the following filter:\n{}\n", input);

    match scim_filter_parser::parse_filter(&input) {
        Ok(filter) => {
            println!("✅ Valid filter");
            println!("{:#?}", filter);
        }
        Err(e) => {
            println!("❎ Invalid filter");
            println!("{}", e);
        }
    }
}
