fn main() {
    git_tracking::commands::main()
}
